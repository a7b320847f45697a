use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use cadence_engine::animation::{AnimatorState, FrameAnimator};
use cadence_engine::core::{App, AppControl, FrameCtx};
use cadence_engine::driver::{FrameLink, SchedulingContext};
use cadence_engine::logging::{init_logging, LoggingConfig};
use cadence_engine::window::{Runtime, RuntimeConfig};

const SWEEP_SECONDS: f64 = 3.0;
const BAR_WIDTH: usize = 24;
const MODAL: SchedulingContext = SchedulingContext::Named("modal");

/// Demo app: a progress sweep rendered into the window title.
struct Studio {
    driver:       Rc<FrameLink>,
    progress:     Rc<Cell<f64>>,
    sweeps_done:  Rc<Cell<u32>>,
    sweep:        Option<FrameAnimator>,
    modal:        bool,
    toggle_modal: bool,
    last_title:   String,
}

impl Studio {
    fn new(driver: Rc<FrameLink>) -> Self {
        Self {
            driver,
            progress:     Rc::new(Cell::new(0.0)),
            sweeps_done:  Rc::new(Cell::new(0)),
            sweep:        None,
            modal:        false,
            toggle_modal: false,
            last_title:   String::new(),
        }
    }

    fn start_sweep(&mut self) {
        if let Some(old) = self.sweep.take() {
            old.cancel();
        }

        let progress = Rc::clone(&self.progress);
        let done = Rc::clone(&self.sweeps_done);

        // Common contexts keep the bar moving while a mouse button is held,
        // but not while the modal context is entered.
        let sweep = FrameAnimator::builder(SWEEP_SECONDS)
            .on_update(move |p| progress.set(p))
            .on_complete(move || {
                done.set(done.get() + 1);
                log::info!("sweep #{} complete", done.get());
            })
            .contexts(SchedulingContext::common())
            .start(self.driver.clone());

        self.sweep = Some(sweep);
    }

    /// Starts the first sweep once frames are flowing.
    fn ensure_started(&mut self) {
        if self.sweep.is_none() {
            self.start_sweep();
        }
    }

    fn status(&self) -> &'static str {
        match self.sweep.as_ref().map(FrameAnimator::state) {
            None => "idle",
            Some(AnimatorState::Running) => "running",
            Some(AnimatorState::Paused) => "paused",
            Some(AnimatorState::Completed) => "done",
            Some(AnimatorState::Cancelled) => "cancelled",
        }
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => {
                if let Some(sweep) = &self.sweep {
                    sweep.set_paused(!sweep.paused());
                }
            }
            PhysicalKey::Code(KeyCode::Backspace) => {
                if let Some(sweep) = &self.sweep {
                    sweep.cancel();
                }
            }
            PhysicalKey::Code(KeyCode::Enter) => self.start_sweep(),
            PhysicalKey::Code(KeyCode::KeyM) => self.toggle_modal = true,
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            _ => {}
        }

        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        self.ensure_started();

        if std::mem::take(&mut self.toggle_modal) {
            if self.modal {
                ctx.runtime.leave_context();
            } else {
                ctx.runtime.enter_context(MODAL);
            }
            self.modal = !self.modal;
        }

        let p = self.progress.get();
        let title = format!(
            "cadence  {}  {:>3.0}%  {}{}",
            progress_bar(p, BAR_WIDTH),
            p * 100.0,
            self.status(),
            if self.modal { "  [modal]" } else { "" },
        );

        // Only touch the platform title when it changes.
        if title != self.last_title {
            ctx.window.set_title(&title);
            self.last_title = title;
        }

        AppControl::Continue
    }
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = (progress.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║           CADENCE STUDIO v0.1          ║");
    println!("  ╠════════════════════════════════════════╣");
    println!("  ║  Enter      restart sweep              ║");
    println!("  ║  Space      pause / resume             ║");
    println!("  ║  Backspace  cancel                     ║");
    println!("  ║  M          toggle modal context       ║");
    println!("  ║  Esc        quit                       ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    let driver = Rc::new(FrameLink::new());
    let studio = Studio::new(Rc::clone(&driver));

    let config = RuntimeConfig {
        title: "cadence studio".to_string(),
        initial_size: LogicalSize::new(720.0, 120.0),
    };

    Runtime::run_with_driver(config, driver, studio)
}
