//! The draw engine: one prize-draw widget instance.
//!
//! PIPELINE (one draw at a time):
//!   1. Redemption code validated and marked used (persisted at once).
//!   2. Prize selected against the current history.
//!   3. Animation armed towards the prize's cell, then ticked by the host.
//!   4. On the stopping tick: history appended and persisted, then the
//!      observer's completion callback fires.
//!
//! RULES:
//!   - `is_drawing` is raised before any side effect of step 1 and lowered
//!     only after step 4, or on any error. No path leaves it raised.
//!   - A submit while drawing is refused and consumes nothing.
//!   - A started draw always runs to completion; there is no cancel.
//!     The one abort is a prize whose cell is unreachable at draw time:
//!     the code stays consumed and a `DrawAborted` event is recorded.
//!   - Storage is read once at construction and written through after
//!     each change. Two engines on one namespace are not coordinated.

use crate::{
    animator::{AnimationRun, Animator, Frame, HighlightSink},
    clock::Clock,
    config::WidgetConfig,
    error::{DrawError, DrawResult},
    event::DrawEvent,
    history::{HistoryLog, HistoryRecord},
    prize::Prize,
    redemption::{self, RedemptionCode, UsedCodeSet},
    rng::{DrawRng, RngBank, RngSlot},
    selector::select_prize,
    store::{KvStore, PersistentState},
    types::{CellIndex, EpochMillis, PrizeId},
};

/// Host-side collaborator: draws the highlight and shows the result.
pub trait DrawObserver: HighlightSink {
    fn on_draw_complete(&mut self, prize: &Prize);
}

/// What an accepted submission will award.
#[derive(Debug, Clone)]
pub struct DrawTicket {
    pub prize:       Prize,
    pub code:        String,
    pub target_cell: CellIndex,
    pub fell_back:   bool,
    pub run:         AnimationRun,
}

struct PendingDraw {
    prize: Prize,
    code:  String,
}

pub struct DrawEngine {
    config:       WidgetConfig,
    clock:        Box<dyn Clock>,
    state:        PersistentState,
    history:      HistoryLog,
    used_codes:   UsedCodeSet,
    animator:     Animator,
    selector_rng: DrawRng,
    animator_rng: DrawRng,
    issuer_rng:   DrawRng,
    is_drawing:   bool,
    pending:      Option<PendingDraw>,
    events:       Vec<DrawEvent>,
}

impl DrawEngine {
    /// Build a widget over `store`, restoring any persisted state.
    pub fn new(
        config: WidgetConfig,
        seed: u64,
        store: Box<dyn KvStore>,
        clock: Box<dyn Clock>,
    ) -> DrawResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, seed, store, clock))
    }

    /// Build without validating `config`.
    fn assemble(
        config: WidgetConfig,
        seed: u64,
        store: Box<dyn KvStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let state = PersistentState::new(store);
        let history = state.load_history(config.history_limit);
        let used_codes = state.load_used_codes();
        let bank = RngBank::new(seed);

        log::debug!(
            "engine ready: {} history records, {} used codes, seed={seed}",
            history.len(),
            used_codes.len()
        );

        Self {
            animator: Animator::new(config.path.clone(), config.animation),
            selector_rng: bank.stream(RngSlot::Selector),
            animator_rng: bank.stream(RngSlot::Animator),
            issuer_rng: bank.stream(RngSlot::CodeIssuer),
            config,
            clock,
            state,
            history,
            used_codes,
            is_drawing: false,
            pending: None,
            events: Vec::new(),
        }
    }

    // ── Draw pipeline ──────────────────────────────────────────

    /// Validate `raw_code` and arm a draw. The host then calls `tick`
    /// after each returned delay until the draw completes.
    pub fn submit(&mut self, raw_code: &str) -> DrawResult<DrawTicket> {
        if self.is_drawing {
            log::warn!("submit ignored: a draw is already in progress");
            return Err(DrawError::DrawInProgress);
        }

        self.is_drawing = true;
        let result = self.begin_draw(raw_code);
        if result.is_err() {
            self.pending = None;
            self.is_drawing = false;
        }
        result
    }

    fn begin_draw(&mut self, raw_code: &str) -> DrawResult<DrawTicket> {
        let now = self.clock.now_millis();
        let code = RedemptionCode::normalize(raw_code);
        let calendar = self.config.calendar;

        if let Err(reason) = redemption::validate(
            &code,
            &mut self.used_codes,
            now,
            &calendar,
            &self.config.codes,
        ) {
            log::warn!("code {code:?} rejected: {reason}");
            self.events.push(DrawEvent::CodeRejected { code, reason, at: now });
            return Err(reason.into());
        }
        self.state.save_used_codes(&self.used_codes);
        log::info!("code {code} accepted");
        self.events.push(DrawEvent::CodeAccepted { code: code.clone(), at: now });

        let selection = select_prize(
            &self.config.prizes,
            &self.history,
            now,
            &calendar,
            &mut self.selector_rng,
        );
        let prize = selection.prize.clone();
        let fell_back = selection.fell_back;
        self.events.push(DrawEvent::PrizeSelected {
            roll:      selection.roll,
            candidate: selection.candidate,
            prize_id:  prize.id,
            fell_back,
        });

        let run = self
            .config
            .target_cell(prize.id)
            .and_then(|cell| self.animator.start(cell, &mut self.animator_rng))
            .inspect_err(|e| {
                log::error!("draw aborted after accepting {code}: {e}");
                self.events.push(DrawEvent::DrawAborted { reason: e.to_string() });
            })?;

        self.events.push(DrawEvent::AnimationStarted {
            target_cell: run.target_cell,
            cycles:      run.cycles,
            total_steps: run.total_steps,
        });
        log::debug!(
            "prize {} ({}) -> cell {}, fell_back={fell_back}",
            prize.id,
            prize.name,
            run.target_cell
        );

        self.pending = Some(PendingDraw { prize: prize.clone(), code: code.clone() });

        Ok(DrawTicket {
            prize,
            code,
            target_cell: run.target_cell,
            fell_back,
            run,
        })
    }

    /// Advance the animation one step. On the stopping tick the draw is
    /// recorded and `observer.on_draw_complete` fires.
    pub fn tick(&mut self, observer: &mut dyn DrawObserver) -> Frame {
        if !self.is_drawing {
            return Frame::QUIET;
        }

        let frame = self.animator.tick();
        if let Some(cell) = frame.highlight {
            observer.render_highlight(cell);
        }

        if frame.finished {
            self.finish_draw(observer);
        } else if frame.delay_ms.is_none() {
            log::error!("draw in progress without an active animation; releasing");
            self.pending = None;
            self.is_drawing = false;
        }
        frame
    }

    fn finish_draw(&mut self, observer: &mut dyn DrawObserver) {
        let Some(pending) = self.pending.take() else {
            log::error!("animation finished with no pending draw");
            self.is_drawing = false;
            return;
        };

        let now = self.clock.now_millis();
        self.history.append(HistoryRecord {
            prize_id:        pending.prize.id,
            name:            pending.prize.name.clone(),
            redemption_code: Some(pending.code.clone()),
            awarded_at:      now,
        });
        let history_persisted = self.state.save_history(&self.history);
        self.is_drawing = false;

        log::info!("draw complete: prize {} ({})", pending.prize.id, pending.prize.name);
        self.events.push(DrawEvent::DrawCompleted {
            prize_id: pending.prize.id,
            prize_name: pending.prize.name.clone(),
            code: Some(pending.code),
            at: now,
            history_persisted,
        });

        observer.on_draw_complete(&pending.prize);
    }

    /// Submit and drive the draw to completion on the caller's scheduler.
    pub fn draw(
        &mut self,
        raw_code: &str,
        observer: &mut dyn DrawObserver,
        mut wait: impl FnMut(u64),
    ) -> DrawResult<Prize> {
        let ticket = self.submit(raw_code)?;
        wait(ticket.run.first_delay_ms);
        loop {
            let frame = self.tick(observer);
            if frame.finished {
                return Ok(ticket.prize);
            }
            match frame.delay_ms {
                Some(delay) => wait(delay),
                None => {
                    return Err(DrawError::Other(anyhow::anyhow!(
                        "animation ended without completing the draw"
                    )))
                }
            }
        }
    }

    // ── Other user actions ─────────────────────────────────────

    /// Forget past awards. Used codes stay used.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.state.clear_history();
        let at = self.clock.now_millis();
        log::info!("history cleared");
        self.events.push(DrawEvent::HistoryCleared { at });
    }

    /// Mint a code valid right now.
    pub fn issue_code(&mut self) -> Option<String> {
        let now = self.clock.now_millis();
        RedemptionCode::issue(now, &self.config.calendar, &mut self.issuer_rng)
            .map(|code| code.as_str().to_string())
    }

    pub fn prize_info(&self, prize_id: PrizeId) -> Option<&Prize> {
        self.config.prizes.get(prize_id)
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn is_drawing(&self) -> bool {
        self.is_drawing
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn used_codes(&self) -> &UsedCodeSet {
        &self.used_codes
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn now(&self) -> EpochMillis {
        self.clock.now_millis()
    }

    pub fn drain_events(&mut self) -> Vec<DrawEvent> {
        std::mem::take(&mut self.events)
    }
}
