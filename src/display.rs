//! Window presentation
//!
//! The scheduler owns the frame cadence, so the winit event loop is pumped
//! once per tick instead of being handed control. Pixels are copied into a
//! softbuffer surface; no GPU is involved.

use crate::scope::DisplayFrame;
use softbuffer::{Context, SoftBufferError, Surface};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

/// How many pumps to wait for the platform to hand us a window
const OPEN_ATTEMPTS: u32 = 100;
const OPEN_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("Failed to create window: {0}")]
    Window(#[from] OsError),
    #[error("Framebuffer error: {0}")]
    Surface(#[from] SoftBufferError),
    #[error("Invalid window size {width}x{height}")]
    Size { width: u32, height: u32 },
    #[error("Window did not open")]
    NotOpened,
    #[error("Window is closed")]
    Closed,
}

/// The screen side of a tick
pub trait Presenter {
    /// Handle pending window events; true once the user asked to quit
    fn poll_quit(&mut self) -> bool;

    fn present(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError>;
}

/// Raised by Ctrl-C in the launching terminal
#[derive(Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Register the process-wide Ctrl-C handler. Can only succeed once.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let flag = Self::default();
        let handler = flag.clone();
        ctrlc::set_handler(move || handler.raise())?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Presenter that also reports a raised [`InterruptFlag`] as a quit request
pub struct Interruptible<P> {
    inner: P,
    interrupt: InterruptFlag,
}

impl<P: Presenter> Interruptible<P> {
    pub fn new(inner: P, interrupt: InterruptFlag) -> Self {
        Self { inner, interrupt }
    }
}

impl<P: Presenter> Presenter for Interruptible<P> {
    fn poll_quit(&mut self) -> bool {
        if self.interrupt.is_raised() {
            info!("Interrupted");
            return true;
        }
        self.inner.poll_quit()
    }

    fn present(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        self.inner.present(frame)
    }
}

struct WindowSurface {
    window: Rc<Window>,
    surface: Surface<Rc<Window>, Rc<Window>>,
    _context: Context<Rc<Window>>,
}

/// winit callbacks land here between pumps
struct ScopeWindow {
    title: String,
    width: NonZeroU32,
    height: NonZeroU32,
    surface: Option<WindowSurface>,
    quit_requested: bool,
    failure: Option<DisplayError>,
}

impl ScopeWindow {
    fn create_surface(&self, event_loop: &ActiveEventLoop) -> Result<WindowSurface, DisplayError> {
        let attributes = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(PhysicalSize::new(self.width.get(), self.height.get()))
            .with_resizable(false);

        let window = Rc::new(event_loop.create_window(attributes)?);
        let context = Context::new(Rc::clone(&window))?;
        let mut surface = Surface::new(&context, Rc::clone(&window))?;
        surface.resize(self.width, self.height)?;

        Ok(WindowSurface {
            window,
            surface,
            _context: context,
        })
    }
}

impl ApplicationHandler for ScopeWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        match self.create_surface(event_loop) {
            Ok(surface) => {
                debug!("Window created: {}x{}", self.width, self.height);
                self.surface = Some(surface);
            }
            Err(e) => {
                error!("Could not open the scope window: {}", e);
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if is_quit_event(&event) {
            info!("Quit requested");
            self.quit_requested = true;
            event_loop.exit();
        }
    }
}

/// Window close, or Escape pressed
fn is_quit_event(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::CloseRequested => true,
        WindowEvent::KeyboardInput { event, .. } => {
            event.state == ElementState::Pressed
                && event.logical_key == Key::Named(NamedKey::Escape)
        }
        _ => false,
    }
}

pub struct WindowPresenter {
    event_loop: EventLoop<()>,
    app: ScopeWindow,
}

impl WindowPresenter {
    /// Create the event loop and block until the platform has mapped the window
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self, DisplayError> {
        let size_error = || DisplayError::Size { width, height };
        let app = ScopeWindow {
            title: title.to_string(),
            width: NonZeroU32::new(width).ok_or_else(size_error)?,
            height: NonZeroU32::new(height).ok_or_else(size_error)?,
            surface: None,
            quit_requested: false,
            failure: None,
        };

        let mut presenter = Self {
            event_loop: EventLoop::new()?,
            app,
        };

        for _ in 0..OPEN_ATTEMPTS {
            let status = presenter
                .event_loop
                .pump_app_events(Some(OPEN_PUMP_TIMEOUT), &mut presenter.app);

            if let Some(e) = presenter.app.failure.take() {
                return Err(e);
            }
            if presenter.app.surface.is_some() {
                return Ok(presenter);
            }
            if let PumpStatus::Exit(_) = status {
                break;
            }
        }

        Err(DisplayError::NotOpened)
    }
}

impl Presenter for WindowPresenter {
    fn poll_quit(&mut self) -> bool {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app)
        {
            debug!("Event loop exited with code {}", code);
            self.app.quit_requested = true;
        }
        self.app.quit_requested
    }

    fn present(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        let target = self.app.surface.as_mut().ok_or(DisplayError::Closed)?;

        let mut buffer = target.surface.buffer_mut()?;
        frame.write_xrgb(&mut buffer);
        target.window.pre_present_notify();
        buffer.present()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_is_quit() {
        assert!(is_quit_event(&WindowEvent::CloseRequested));
        assert!(!is_quit_event(&WindowEvent::Focused(true)));
        assert!(!is_quit_event(&WindowEvent::Destroyed));
    }

    struct StillPresenter {
        polls: usize,
    }

    impl Presenter for StillPresenter {
        fn poll_quit(&mut self) -> bool {
            self.polls += 1;
            false
        }

        fn present(&mut self, _frame: &DisplayFrame) -> Result<(), DisplayError> {
            Ok(())
        }
    }

    #[test]
    fn test_interrupt_flag_requests_quit() {
        let flag = InterruptFlag::default();
        let mut presenter = Interruptible::new(StillPresenter { polls: 0 }, flag.clone());

        assert!(!presenter.poll_quit());
        assert_eq!(presenter.inner.polls, 1);

        flag.raise();
        assert!(presenter.poll_quit());
        assert!(presenter.poll_quit());
        assert_eq!(presenter.inner.polls, 1);
    }

    #[test]
    fn test_error_messages() {
        let e = DisplayError::Size {
            width: 0,
            height: 720,
        };
        assert_eq!(e.to_string(), "Invalid window size 0x720");
        assert_eq!(DisplayError::Closed.to_string(), "Window is closed");
    }
}
