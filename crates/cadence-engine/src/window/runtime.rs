use std::collections::HashSet;
use std::rc::Rc;

use anyhow::{Context, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::driver::{FrameLink, SchedulingContext};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cadence".to_string(),
            initial_size: LogicalSize::new(640.0, 360.0),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    /// Dispatch subsequent frames under `context` until [`leave_context`](Self::leave_context).
    ///
    /// Entered contexts nest and take precedence over pointer tracking.
    pub fn enter_context(&mut self, context: SchedulingContext) {
        self.commands.push(Command::EnterContext(context));
    }

    pub fn leave_context(&mut self) {
        self.commands.push(Command::LeaveContext);
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    EnterContext(SchedulingContext),
    LeaveContext,
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs `app` with a fresh frame driver.
    pub fn run<A>(initial: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        Self::run_with_driver(initial, Rc::new(FrameLink::new()), app)
    }

    /// Runs `app`, pumping `driver` once per redraw.
    ///
    /// Use this when the app needs the driver before the first frame.
    pub fn run_with_driver<A>(initial: RuntimeConfig, driver: Rc<FrameLink>, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, driver, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct WindowEntry {
    window: Window,
    clock: FrameClock,
    buttons_down: HashSet<MouseButton>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    initial: RuntimeConfig,
    driver: Rc<FrameLink>,
    app: A,

    window: Option<WindowEntry>,
    entered: Vec<SchedulingContext>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(initial: RuntimeConfig, driver: Rc<FrameLink>, app: A) -> Self {
        Self {
            initial,
            driver,
            app,
            window: None,
            entered: Vec::new(),
            exit_requested: false,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.initial.title.clone())
            .with_inner_size(self.initial.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        // Share the driver's clock so app frame times and tick timestamps agree.
        let clock = FrameClock::with_source(self.driver.source_clock());

        self.window = Some(WindowEntry {
            window,
            clock,
            buttons_down: HashSet::new(),
        });
        Ok(())
    }

    /// Context the next frame is dispatched under.
    fn active_context(&self) -> SchedulingContext {
        if let Some(context) = self.entered.last() {
            return *context;
        }
        match &self.window {
            Some(entry) if !entry.buttons_down.is_empty() => SchedulingContext::Tracking,
            _ => SchedulingContext::Default,
        }
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::EnterContext(context) => {
                    log::debug!("entering scheduling context {context}");
                    self.entered.push(context);
                }
                Command::LeaveContext => {
                    if let Some(context) = self.entered.pop() {
                        log::debug!("left scheduling context {context}");
                    }
                }
                Command::Exit => self.request_exit(),
            }
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn track_pointer(&mut self, event: &WindowEvent) {
        let Some(entry) = self.window.as_mut() else {
            return;
        };
        match event {
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    entry.buttons_down.insert(*button);
                }
                ElementState::Released => {
                    entry.buttons_down.remove(button);
                }
            },
            // Avoid stuck tracking when focus changes mid-press.
            WindowEvent::Focused(false) | WindowEvent::CursorLeft { .. } => {
                entry.buttons_down.clear();
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let context = self.active_context();
        let mut runtime_ctx = RuntimeCtx::default();

        let Some(entry) = self.window.as_mut() else {
            return;
        };

        let ft: FrameTime = entry.clock.tick();
        let ticked = self.driver.dispatch_at(context, ft.now);
        log::trace!("frame {} ({context}): {ticked} subscription(s) ticked", ft.frame_index);

        let app_control = {
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: &entry.window,
                },
                time: ft,
                context,
                driver: &self.driver,
                runtime: &mut runtime_ctx,
            };
            self.app.on_frame(&mut ctx)
        };

        if app_control == AppControl::Exit {
            runtime_ctx.exit();
        }

        self.apply_commands(event_loop, runtime_ctx);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            self.request_exit();
            event_loop.exit();
            return;
        }

        if let Some(entry) = &self.window {
            entry.window.request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the frame driver ticks once per presented frame.
        if let Some(entry) = &self.window {
            entry.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        self.track_pointer(&event);

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = &self.window {
                    entry.window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
