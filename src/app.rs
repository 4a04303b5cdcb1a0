//! Desktop application
//!
//! Owns the window, the GPU session and the simulated headset, and runs one
//! stereo frame per redraw: sample tracking, plan the frame, execute it and
//! hand the eye buffer to the mirror compositor.

use std::sync::Arc;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::CaveConfig;
use crate::driver::StereoDriver;
use crate::error::{CaveError, CaveResult, GpuError};
use crate::gpu::{GpuContext, MirrorCompositor, Renderer};
use crate::hmd::sim::SimulatedHmd;
use crate::hmd::{Compositor, Tracking, TrackingSample};

/// GPU resources tied to the window; dropped before it
struct Session {
    compositor: MirrorCompositor,
    renderer: Renderer,
    gpu: GpuContext,
    window: Arc<Window>,
}

/// Main application state
pub struct CaveApp {
    config: CaveConfig,
    driver: StereoDriver,
    hmd: SimulatedHmd,
    session: Option<Session>,
    frame: u64,
    error: Option<CaveError>,
}

impl CaveApp {
    pub fn new(config: CaveConfig, seed: Option<u64>) -> Self {
        let driver = match seed {
            Some(seed) => StereoDriver::with_seed(config.clone(), seed),
            None => StereoDriver::new(config.clone()),
        };
        let hmd = SimulatedHmd::new(config.simulator.clone(), config.dominant_hand);
        Self { config, driver, hmd, session: None, frame: 0, error: None }
    }

    fn start_session(&self, event_loop: &ActiveEventLoop) -> CaveResult<Session> {
        let (eye_width, eye_height) = self.hmd.eye_resolution();
        let window_attrs = Window::default_attributes()
            .with_title("CAVE Simulator")
            .with_inner_size(PhysicalSize::new(eye_width, eye_height / 2));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| CaveError::Window(e.to_string()))?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GpuError::Surface(e.to_string()))?;

        let gpu = pollster::block_on(GpuContext::new(&instance, Some(&surface)))?;
        let renderer = Renderer::new(&gpu, &self.config, (eye_width, eye_height))?;
        let size = window.inner_size();
        let compositor =
            MirrorCompositor::new(&gpu, surface, (size.width, size.height), self.config.simulator.refresh_rate)?;

        info!("Session started");
        Ok(Session { compositor, renderer, gpu, window })
    }

    fn render(&mut self) -> CaveResult<()> {
        let Some(session) = &mut self.session else {
            return Ok(());
        };

        let display_time = session.compositor.predicted_display_time(self.frame);
        let sample =
            TrackingSample::capture(&mut self.hmd, self.frame, display_time, self.config.near, self.config.far);
        let plan = self.driver.render_frame(&sample);

        let eyes = session.renderer.render(&session.gpu, &plan);
        session.compositor.submit_frame(self.frame, &session.gpu, eyes)?;

        self.frame += 1;
        session.window.request_redraw();
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        match code {
            KeyCode::Escape if pressed => {
                info!("Escape pressed");
                event_loop.exit();
            }
            KeyCode::KeyR => {
                if pressed && !event.repeat {
                    self.hmd.recenter();
                }
            }
            _ => self.hmd.handle_key(code, pressed),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: CaveError) {
        error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for CaveApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        info!("App resumed - creating window");
        match self.start_session(event_loop) {
            Ok(session) => {
                session.window.request_redraw();
                self.session = Some(session);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        info!("App suspended - releasing GPU resources");
        self.session = None;
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(session) = &mut self.session {
                    session.compositor.resize(&session.gpu, size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }
}

/// Run the simulator until the window closes
pub fn run(config: CaveConfig, seed: Option<u64>) -> CaveResult<()> {
    let event_loop = EventLoop::new()?;
    let mut app = CaveApp::new(config, seed);
    event_loop.run_app(&mut app)?;

    info!("Rendered {} frames", app.frame);
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
