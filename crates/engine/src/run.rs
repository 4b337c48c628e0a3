//! The blocking run loop.
//!
//! Owns the winit event loop. The window and engine come up on `resumed`;
//! every redraw ticks the frame clock, invokes the application's callback
//! with the delta time and renders one frame. Closing the window exits
//! the loop, which tears the engine down.

use tracing::{error, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use glint_core::FrameClock;
use glint_platform::Window;

use crate::engine::{Engine, EngineConfig};
use crate::error::{EngineError, EngineResult};

/// Per-frame application hook. Receives the engine (for uploads and
/// settings) and the seconds elapsed since the previous frame.
pub type FrameCallback = Box<dyn FnMut(&mut Engine, f32)>;

struct App {
    config: EngineConfig,
    callback: FrameCallback,
    window: Option<Window>,
    engine: Option<Engine>,
    clock: FrameClock,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }

        let window = match Window::new(
            event_loop,
            self.config.width,
            self.config.height,
            &self.config.title,
        ) {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, "Window creation failed");
                event_loop.exit();
                return;
            }
        };

        match Engine::new(&window, &self.config) {
            Ok(engine) => {
                self.window = Some(window);
                self.engine = Some(engine);
                self.clock = FrameClock::new();
            }
            Err(e) => {
                error!(error = %e, "Engine startup failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                // Nothing to do eagerly; the next acquire or present
                // reports the chain stale and triggers the rebuild.
            }
            WindowEvent::RedrawRequested => {
                if let Some(engine) = self.engine.as_mut() {
                    let delta = self.clock.tick();
                    (self.callback)(engine, delta);
                    if let Err(e) = engine.render_frame() {
                        warn!(error = %e, "Frame abandoned");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Creates the window and engine, then runs the render loop until the
/// window is closed.
///
/// `callback` runs once per frame before rendering. Frame errors are
/// logged and the frame skipped; only startup and event-loop failures
/// end the loop with an error.
pub fn run(
    config: EngineConfig,
    callback: impl FnMut(&mut Engine, f32) + 'static,
) -> EngineResult<()> {
    let event_loop = EventLoop::new().map_err(|e| EngineError::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        callback: Box::new(callback),
        window: None,
        engine: None,
        clock: FrameClock::new(),
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::EventLoop(e.to_string()))
}
