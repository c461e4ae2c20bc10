//! [`LineLoop`] – the per-tick orchestrator of the inspection line.
//!
//! Owns every component of the line and drives them in a fixed order.  Each
//! call to [`LineLoop::tick`]:
//!
//! 1. **Gate** – decide whether the belt runs this tick.  It is stopped while
//!    any item sits at inspection, a verdict is pending, the inspection slot
//!    is still bound, the pusher is away from its rest position, or (with
//!    `hold_at_line_end`) the frontmost in-flow item is an accepted item
//!    resting exactly on the end-of-line coordinate.
//! 2. **Convey** – when running, [`ConveyorController::advance`] moves items
//!    and reports arrivals, which bind the [`InspectionGate`].
//! 3. **Decide** – when a verdict is pending, take at most one from the
//!    [`DecisionSource`] and apply it.  Verdicts arriving while nothing is
//!    pending are discarded.
//! 4. **Actuate** – step the [`RejectActuator`]; a finished stroke releases
//!    the gate.
//! 5. **Commit** – push the pose of every changed body to the
//!    [`RenderBackend`] and return the item deltas.
//!
//! Accepted items reaching the end of the line are announced on
//! [`Topic::Motion`].  Items reaching their terminal state are written to the
//! [`TraceSink`] and announced on [`Topic::Audit`].  All other notable changes are published on
//! the matching [`EventBus`] topic.
//!
//! # Example
//!
//! ```rust
//! use inspectline_runtime::decision::ScriptedDecisions;
//! use inspectline_runtime::line_loop::LineLoop;
//! use inspectline_types::{Decision, LineConfig};
//!
//! let verdicts = ScriptedDecisions::default().with_fallback(Decision::Accept);
//! let mut line = LineLoop::new(LineConfig::default())
//!     .unwrap()
//!     .with_decision_source(Box::new(verdicts));
//!
//! while !line.is_finished() {
//!     line.tick().unwrap();
//! }
//! ```

use std::f64::consts::FRAC_PI_2;

use inspectline_hal::{NullRenderer, RenderBackend};
use inspectline_kernel::{
    ConveyorController, ConveyorEvent, InspectionGate, ItemRegistry, RejectActuator,
};
use inspectline_middleware::{EventBus, Topic};
use inspectline_types::{
    BodyId, Decision, Event, EventPayload, Item, ItemDelta, ItemHandle, ItemState, LineConfig,
    LineError, PusherPhaseKind, Quaternion, Vec3,
};
use serde::Serialize;
use tracing::{debug, info, trace_span, warn};

use crate::decision::DecisionSource;
use crate::traceability::{TraceRecord, TraceSink};

const SOURCE: &str = "inspectline-runtime::line_loop";

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view of the whole line, for status displays and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSnapshot {
    pub tick: u64,
    /// Whether the belt ran on the most recent tick.
    pub ran_last_tick: bool,
    pub decision_pending: bool,
    pub pending_item: Option<ItemHandle>,
    pub pusher_phase: PusherPhaseKind,
    pub active_reject: Option<ItemHandle>,
    pub pusher_position: Vec3,
    pub items: Vec<Item>,
}

impl LineSnapshot {
    /// Number of items in `state`.
    pub fn count_in(&self, state: ItemState) -> usize {
        self.items.iter().filter(|i| i.state == state).count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LineLoop
// ─────────────────────────────────────────────────────────────────────────────

/// The inspection line and everything that drives it.
pub struct LineLoop {
    config: LineConfig,
    registry: ItemRegistry,
    conveyor: ConveyorController,
    gate: InspectionGate,
    actuator: RejectActuator,
    renderer: Box<dyn RenderBackend>,
    decisions: Option<Box<dyn DecisionSource>>,
    trace: Option<Box<dyn TraceSink>>,
    bus: EventBus,
    arm_orientation: Quaternion,
    tick: u64,
    ran_last_tick: bool,
    /// Pusher and arm poses need pushing to the renderer.
    actuator_dirty: bool,
}

impl LineLoop {
    /// Build the line described by `config` with every item on the belt at
    /// its start position.
    ///
    /// Starts with a [`NullRenderer`], no decision source, no trace sink and
    /// a private event bus; attach real ones with the `with_*` builders.
    ///
    /// # Errors
    ///
    /// [`LineError::InvalidConfig`] when `config` fails validation.
    pub fn new(config: LineConfig) -> Result<Self, LineError> {
        config.validate()?;

        let mut registry = ItemRegistry::new();
        for (start, tag) in config.item_layout() {
            registry.create_item(start, Quaternion::IDENTITY, tag);
        }
        info!(
            items = registry.len(),
            speed = config.speed,
            tick_secs = config.tick_secs,
            "inspection line built"
        );

        Ok(Self {
            conveyor: ConveyorController::new(&config),
            actuator: RejectActuator::new(&config),
            gate: InspectionGate::new(),
            registry,
            renderer: Box::new(NullRenderer),
            decisions: None,
            trace: None,
            bus: EventBus::default(),
            arm_orientation: Quaternion::about_x(FRAC_PI_2),
            tick: 0,
            ran_last_tick: false,
            actuator_dirty: true,
            config,
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn RenderBackend>) -> Self {
        debug!(backend = renderer.name(), "render backend attached");
        self.renderer = renderer;
        self
    }

    pub fn with_decision_source(mut self, source: Box<dyn DecisionSource>) -> Self {
        self.decisions = Some(source);
        self
    }

    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Publish on `bus` instead of the private one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn actuator(&self) -> &RejectActuator {
        &self.actuator
    }

    pub fn gate(&self) -> &InspectionGate {
        &self.gate
    }

    /// A handle to the bus this loop publishes on.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_decision_pending(&self) -> bool {
        self.gate.is_decision_pending()
    }

    /// `true` once every item is processed.  Further ticks change nothing.
    pub fn is_finished(&self) -> bool {
        self.registry.all_processed()
    }

    /// Whether the belt would run if a tick started now.
    pub fn conveyor_running(&self) -> bool {
        belt_runs(&self.registry, &self.gate, &self.actuator, &self.config)
    }

    pub fn snapshot(&self) -> LineSnapshot {
        LineSnapshot {
            tick: self.tick,
            ran_last_tick: self.ran_last_tick,
            decision_pending: self.gate.is_decision_pending(),
            pending_item: self.gate.pending_item(),
            pusher_phase: self.actuator.phase().kind(),
            active_reject: self.actuator.active_item(),
            pusher_position: self.actuator.pusher_position(),
            items: self.registry.items().to_vec(),
        }
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Apply a verdict to the item awaiting one, outside of the tick cycle.
    ///
    /// An accepted item starts moving on the next tick; a rejected item is
    /// handed to the pusher, which starts its stroke on the next tick.
    ///
    /// # Errors
    ///
    /// [`LineError::InvalidDecision`] when nothing awaits a verdict.  The
    /// line is left untouched.
    pub fn submit_decision(&mut self, decision: Decision) -> Result<ItemHandle, LineError> {
        self.apply_decision(decision)
    }

    /// Advance the line by one tick and return the items that changed.
    ///
    /// # Errors
    ///
    /// Any error here means a component broke an invariant or the render
    /// backend failed; the loop should not be ticked again.
    pub fn tick(&mut self) -> Result<Vec<ItemDelta>, LineError> {
        self.tick += 1;
        let _span = trace_span!("tick", n = self.tick).entered();

        // 1. Gate
        self.ran_last_tick = self.conveyor_running();

        // 2. Convey
        if self.ran_last_tick {
            for event in self.conveyor.advance(&mut self.registry)? {
                match event {
                    ConveyorEvent::ArrivedAtInspection(item) => {
                        self.gate.on_arrival(item);
                        let batch_tag = self.registry.get(item)?.batch_tag.clone();
                        self.publish(
                            Topic::Inspection,
                            EventPayload::ItemArrived { item, batch_tag },
                        );
                    }
                    ConveyorEvent::ReachedLineEnd(item) => {
                        let position = self.registry.get(item)?.position;
                        self.publish(
                            Topic::Motion,
                            EventPayload::ReachedLineEnd { item, position },
                        );
                        self.finish(item)?;
                    }
                }
            }
        }

        // 3. Decide
        if self.gate.is_decision_pending() {
            if let Some(decision) = self.decisions.as_mut().and_then(|s| s.poll()) {
                self.apply_decision(decision)?;
            }
        } else if let Some(source) = self.decisions.as_mut() {
            let dropped = source.discard_stale();
            if dropped > 0 {
                warn!(dropped, "verdict received with no item at inspection; ignored");
            }
        }

        // 4. Actuate
        if !self.actuator.is_retracted() {
            let step = self.actuator.step(&mut self.registry)?;
            self.actuator_dirty |= step.moved;
            if let Some((from, to)) = step.transition
                && let Some(item) = step.released.or(self.actuator.active_item())
            {
                self.publish(
                    Topic::Actuator,
                    EventPayload::PusherPhaseChanged { item, from, to },
                );
            }
            if let Some(item) = step.released {
                self.gate.release(item);
                self.finish(item)?;
            }
        }

        // 5. Commit
        self.commit()
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn apply_decision(&mut self, decision: Decision) -> Result<ItemHandle, LineError> {
        let item = self
            .gate
            .decide(decision, &mut self.registry, &mut self.actuator)?;
        self.publish(
            Topic::Inspection,
            EventPayload::DecisionApplied { item, decision },
        );
        if decision == Decision::Reject {
            self.publish(
                Topic::Actuator,
                EventPayload::PusherPhaseChanged {
                    item,
                    from: PusherPhaseKind::Retracted,
                    to: PusherPhaseKind::Extending,
                },
            );
        }
        Ok(item)
    }

    /// Record an item that just reached its terminal state.
    fn finish(&mut self, handle: ItemHandle) -> Result<(), LineError> {
        let item = self.registry.get(handle)?;
        let (Some(outcome), Some(record)) = (item.outcome, TraceRecord::for_item(item, self.tick))
        else {
            warn!(item = %handle, "processed item has no verdict; not traced");
            return Ok(());
        };
        info!(
            item = %handle,
            batch = %record.batch_tag,
            status = ?record.status,
            "item processed"
        );

        if let Some(sink) = self.trace.as_mut()
            && let Err(e) = sink.record(&record)
        {
            warn!(item = %handle, error = %e, "trace log write failed");
            self.publish(
                Topic::Audit,
                EventPayload::Fault {
                    component: "traceability".to_string(),
                    message: e.to_string(),
                },
            );
        }

        self.publish(
            Topic::Audit,
            EventPayload::ItemProcessed {
                item: handle,
                outcome,
            },
        );
        Ok(())
    }

    fn commit(&mut self) -> Result<Vec<ItemDelta>, LineError> {
        let dirty = self.registry.take_dirty();
        let mut deltas = Vec::with_capacity(dirty.len());
        for handle in dirty {
            let item = self.registry.get(handle)?;
            self.renderer
                .set_pose(BodyId::Item(handle), item.position, item.orientation)?;
            deltas.push(ItemDelta {
                handle,
                position: item.position,
                state: item.state,
            });
        }

        if std::mem::take(&mut self.actuator_dirty) {
            self.renderer.set_pose(
                BodyId::Pusher,
                self.actuator.pusher_position(),
                Quaternion::IDENTITY,
            )?;
            self.renderer.set_pose(
                BodyId::Arm,
                self.actuator.arm_position(),
                self.arm_orientation,
            )?;
        }
        Ok(deltas)
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        let receivers = self
            .bus
            .publish_to(topic, Event::new(SOURCE, self.tick, payload));
        debug!(?topic, receivers, "event published");
    }
}

/// The belt-gating rule, evaluated from component state alone.
fn belt_runs(
    registry: &ItemRegistry,
    gate: &InspectionGate,
    actuator: &RejectActuator,
    config: &LineConfig,
) -> bool {
    if registry.count_in(ItemState::AtInspection) > 0
        || gate.is_decision_pending()
        || gate.pending_item().is_some()
        || !actuator.is_retracted()
    {
        return false;
    }
    if config.hold_at_line_end
        && let Some(front) = registry.frontmost(ItemState::is_in_flow)
        && front.state == ItemState::AcceptedToEnd
        && front.position.x == config.end_x
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{ScriptedDecisions, decision_channel};
    use crate::traceability::{MemoryTraceLog, TraceStatus};
    use inspectline_hal::RecordingRenderer;
    use inspectline_types::BatchSpec;

    const MAX_TICKS: u64 = 200_000;

    fn single_item() -> LineConfig {
        LineConfig {
            batches: vec![BatchSpec::new("B0", 1)],
            ..LineConfig::default()
        }
    }

    fn item(line: &LineLoop, h: u32) -> Item {
        line.registry().get(ItemHandle(h)).unwrap().clone()
    }

    /// Tick until `done` holds; returns the ticks taken.
    fn tick_until(line: &mut LineLoop, done: impl Fn(&LineLoop) -> bool) -> u64 {
        let mut n = 0;
        while !done(line) {
            line.tick().unwrap();
            n += 1;
            assert!(n < MAX_TICKS, "condition never met");
        }
        n
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = LineConfig {
            speed: 0.0,
            ..LineConfig::default()
        };
        assert!(matches!(
            LineLoop::new(cfg),
            Err(LineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn items_start_on_the_belt_in_layout_order() {
        let line = LineLoop::new(LineConfig::default()).unwrap();
        let snap = line.snapshot();
        assert_eq!(snap.items.len(), 6);
        assert_eq!(snap.count_in(ItemState::OnConveyor), 6);
        assert_eq!(snap.items[0].batch_tag, "B3");
        assert_eq!(snap.items[5].batch_tag, "B0");
        assert!(line.conveyor_running());
    }

    #[test]
    fn item_arrives_exactly_on_inspection_point() {
        let mut line = LineLoop::new(single_item()).unwrap();
        let ticks = tick_until(&mut line, |l| l.is_decision_pending());

        // 1.4 m at 0.2 m/s and 240 Hz.
        assert!((1679..=1681).contains(&ticks), "took {ticks} ticks");
        let it = item(&line, 0);
        assert_eq!(it.state, ItemState::AtInspection);
        assert_eq!(it.position.x, 0.0);
        assert_eq!(line.gate().pending_item(), Some(ItemHandle(0)));
        assert!(!line.conveyor_running());
    }

    #[test]
    fn belt_stays_stopped_without_a_verdict() {
        let mut line = LineLoop::new(single_item()).unwrap();
        tick_until(&mut line, |l| l.is_decision_pending());
        for _ in 0..500 {
            assert!(line.tick().unwrap().is_empty());
        }
        assert_eq!(item(&line, 0).position.x, 0.0);
        assert!(!line.snapshot().ran_last_tick);
    }

    #[test]
    fn accepted_item_travels_to_end_of_line() {
        let mut line = LineLoop::new(single_item()).unwrap();
        tick_until(&mut line, |l| l.is_decision_pending());

        assert_eq!(line.submit_decision(Decision::Accept).unwrap(), ItemHandle(0));
        assert_eq!(item(&line, 0).state, ItemState::AcceptedToEnd);
        assert!(!line.is_decision_pending());
        assert!(line.gate().pending_item().is_none());

        let deltas = line.tick().unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].position.x > 0.0);

        tick_until(&mut line, |l| l.is_finished());
        let it = item(&line, 0);
        assert_eq!(it.state, ItemState::Processed);
        assert_eq!(it.position.x, 1.4);
        assert_eq!(it.outcome, Some(Decision::Accept));
    }

    #[test]
    fn rejected_item_is_pushed_off_and_line_resumes() {
        let mut line = LineLoop::new(single_item()).unwrap();
        tick_until(&mut line, |l| l.is_decision_pending());

        line.submit_decision(Decision::Reject).unwrap();
        assert_eq!(item(&line, 0).state, ItemState::RejectedAnimating);
        assert_eq!(line.actuator().phase().kind(), PusherPhaseKind::Extending);
        assert_eq!(line.gate().pending_item(), Some(ItemHandle(0)));

        tick_until(&mut line, |l| {
            l.actuator().phase().kind() == PusherPhaseKind::Extended
        });
        let pushed = item(&line, 0).position;
        // Plate face at -0.34 plus the item's half extent.
        assert!((pushed.y - (-0.39)).abs() < 1e-9, "y = {}", pushed.y);
        assert_eq!(pushed.x, 0.0);
        assert!(!line.conveyor_running());

        tick_until(&mut line, |l| l.actuator().is_retracted());
        let it = item(&line, 0);
        assert_eq!(it.state, ItemState::Processed);
        assert_eq!(it.position, pushed, "item stays where it was left");
        assert!(line.gate().pending_item().is_none());
        assert!(line.conveyor_running());
        assert!(line.is_finished());
    }

    #[test]
    fn follower_waits_behind_item_at_inspection() {
        let cfg = LineConfig {
            batches: vec![BatchSpec::new("B0", 2)],
            rearmost_start_x: -0.5,
            ..LineConfig::default()
        };
        let step = cfg.travel_per_tick();
        let mut line = LineLoop::new(cfg).unwrap();
        tick_until(&mut line, |l| l.is_decision_pending());

        assert_eq!(line.gate().pending_item(), Some(ItemHandle(1)));
        let follower = item(&line, 0);
        assert_eq!(follower.state, ItemState::OnConveyor);
        // The front item may need one extra tick to cover its gap, which the
        // follower also travels; the clamp only absorbs it for the front.
        let gap = -follower.position.x;
        assert!(gap <= 0.25 + 1e-9 && gap >= 0.25 - step - 1e-9, "gap = {gap}");

        for _ in 0..100 {
            line.tick().unwrap();
        }
        assert_eq!(item(&line, 0).position, follower.position);
    }

    #[test]
    fn verdict_with_nothing_pending_changes_nothing() {
        let mut line = LineLoop::new(LineConfig::default()).unwrap();
        line.tick().unwrap();
        let before = line.snapshot();

        let err = line.submit_decision(Decision::Accept).unwrap_err();
        assert!(matches!(err, LineError::InvalidDecision { .. }));
        assert_eq!(line.snapshot(), before);
    }

    #[test]
    fn stray_channel_verdicts_are_discarded() {
        let (tx, rx) = decision_channel();
        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_decision_source(Box::new(rx));

        // Sent while the item is still travelling: must not be applied later.
        tx.send(Decision::Reject);
        line.tick().unwrap();
        tick_until(&mut line, |l| l.is_decision_pending());
        for _ in 0..10 {
            line.tick().unwrap();
        }
        assert_eq!(item(&line, 0).state, ItemState::AtInspection);

        tx.send(Decision::Accept);
        line.tick().unwrap();
        assert_eq!(item(&line, 0).state, ItemState::AcceptedToEnd);
    }

    #[test]
    fn one_verdict_per_tick_from_source() {
        let (tx, rx) = decision_channel();
        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_decision_source(Box::new(rx));
        tick_until(&mut line, |l| l.is_decision_pending());

        tx.send(Decision::Reject);
        tx.send(Decision::Accept);
        line.tick().unwrap();
        assert_eq!(item(&line, 0).state, ItemState::RejectedAnimating);
        assert_eq!(item(&line, 0).outcome, Some(Decision::Reject));
    }

    #[test]
    fn renderer_receives_item_and_pusher_poses() {
        let renderer = RecordingRenderer::new();
        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_renderer(Box::new(renderer.clone()));

        line.tick().unwrap();
        let (pusher, _) = renderer.pose(BodyId::Pusher).unwrap();
        let (arm, arm_rot) = renderer.pose(BodyId::Arm).unwrap();
        assert!((pusher.y - 0.235).abs() < 1e-12);
        assert!((arm.y - 0.335).abs() < 1e-12);
        assert_eq!(arm_rot, Quaternion::about_x(FRAC_PI_2));
        assert!(renderer.pose(BodyId::Item(ItemHandle(0))).is_some());

        // Retracted pusher is not re-sent every tick.
        let after_first = renderer.update_count();
        line.tick().unwrap();
        assert_eq!(renderer.update_count(), after_first + 1);
    }

    struct Disconnected;

    impl RenderBackend for Disconnected {
        fn name(&self) -> &str {
            "disconnected"
        }

        fn set_pose(&mut self, body: BodyId, _: Vec3, _: Quaternion) -> Result<(), LineError> {
            Err(LineError::Render {
                body,
                details: "visualiser gone".to_string(),
            })
        }
    }

    #[test]
    fn render_failure_surfaces_from_tick() {
        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_renderer(Box::new(Disconnected));
        let err = line.tick().unwrap_err();
        assert!(matches!(err, LineError::Render { .. }));
    }

    #[test]
    fn events_are_published_on_their_topics() {
        let bus = EventBus::default();
        let mut inspection = bus.subscribe_to(Topic::Inspection);
        let mut actuator = bus.subscribe_to(Topic::Actuator);
        let mut audit = bus.subscribe_to(Topic::Audit);

        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_bus(bus)
            .with_decision_source(Box::new(ScriptedDecisions::new([Decision::Reject])));
        tick_until(&mut line, |l| l.is_finished());

        let kinds: Vec<_> = inspection.drain().into_iter().map(|e| e.payload).collect();
        assert!(matches!(kinds[0], EventPayload::ItemArrived { .. }));
        assert!(matches!(
            kinds[1],
            EventPayload::DecisionApplied {
                decision: Decision::Reject,
                ..
            }
        ));

        let phases: Vec<_> = actuator
            .drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::PusherPhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            [
                PusherPhaseKind::Extending,
                PusherPhaseKind::Extended,
                PusherPhaseKind::Retracting,
                PusherPhaseKind::Retracted
            ]
        );

        let audit = audit.drain();
        assert_eq!(audit.len(), 1);
        assert!(matches!(
            audit[0].payload,
            EventPayload::ItemProcessed {
                outcome: Decision::Reject,
                ..
            }
        ));
    }

    #[test]
    fn accepted_item_announces_end_of_line_on_motion() {
        let bus = EventBus::default();
        let mut motion = bus.subscribe_to(Topic::Motion);
        let mut line = LineLoop::new(single_item())
            .unwrap()
            .with_bus(bus)
            .with_decision_source(Box::new(ScriptedDecisions::new([Decision::Accept])));
        tick_until(&mut line, |l| l.is_finished());

        let events = motion.drain();
        assert_eq!(events.len(), 1);
        match &events[0].payload {
            EventPayload::ReachedLineEnd { item, position } => {
                assert_eq!(*item, ItemHandle(0));
                assert_eq!(position.x, 1.4);
            }
            other => panic!("unexpected motion event {other:?}"),
        }
        assert_eq!(events[0].tick, line.tick_count());
    }

    #[test]
    fn full_line_keeps_every_invariant() {
        let verdicts = [
            Decision::Accept,
            Decision::Reject,
            Decision::Accept,
            Decision::Reject,
            Decision::Reject,
            Decision::Accept,
        ];
        let trace = MemoryTraceLog::new();
        let mut line = LineLoop::new(LineConfig::default())
            .unwrap()
            .with_decision_source(Box::new(ScriptedDecisions::new(verdicts)))
            .with_trace_sink(Box::new(trace.clone()));

        let mut prev = line.snapshot();
        while !line.is_finished() {
            line.tick().unwrap();
            let snap = line.snapshot();
            assert!(snap.tick < MAX_TICKS);

            // Single occupancy.
            assert!(snap.count_in(ItemState::AtInspection) <= 1);
            assert!(snap.count_in(ItemState::RejectedAnimating) <= 1);

            // Gating: nothing on the belt moves while the slot is busy.
            if prev.count_in(ItemState::AtInspection) > 0
                || prev.pusher_phase != PusherPhaseKind::Retracted
            {
                for (a, b) in prev.items.iter().zip(&snap.items) {
                    if a.state == ItemState::OnConveyor {
                        assert_eq!(a.position, b.position, "{} moved while gated", a.handle);
                    }
                }
            }

            // No overtaking: handles are issued rearmost first.
            let flowing: Vec<&Item> = snap.items.iter().filter(|i| i.state.is_in_flow()).collect();
            for w in flowing.windows(2) {
                assert!(w[0].position.x <= w[1].position.x);
            }

            // One reject target for the whole stroke, and the stroke touches
            // nothing else: the belt is held, so no other item may change.
            if let (Some(a), Some(b)) = (prev.active_reject, snap.active_reject) {
                assert_eq!(a, b);
            }
            if let Some(target) = prev.active_reject {
                for (a, b) in prev.items.iter().zip(&snap.items) {
                    if a.handle != target {
                        assert_eq!(a, b, "{} changed during the stroke on {target}", a.handle);
                    }
                }
            }

            // Processed items are inert.
            for (a, b) in prev.items.iter().zip(&snap.items) {
                if a.state == ItemState::Processed {
                    assert_eq!(a, b);
                }
            }
            prev = snap;
        }

        // Front of the queue is inspected first.
        let records = trace.records();
        assert_eq!(records.len(), 6);
        let order: Vec<u32> = records.iter().map(|r| r.item.0).collect();
        let rejected: Vec<u32> = records
            .iter()
            .filter(|r| r.status == TraceStatus::Rejected)
            .map(|r| r.item.0)
            .collect();
        assert_eq!(rejected, [4, 2, 1]);
        let distinct: std::collections::BTreeSet<u32> = order.iter().copied().collect();
        assert_eq!(distinct.len(), 6);

        for it in line.registry().items() {
            assert_eq!(it.state, ItemState::Processed);
            match it.outcome {
                Some(Decision::Accept) => assert_eq!(it.position.x, 1.4),
                Some(Decision::Reject) => assert_eq!(it.position.x, 0.0),
                None => panic!("{} processed without a verdict", it.handle),
            }
        }

        // Idempotent once finished.
        let done = line.snapshot();
        assert!(line.tick().unwrap().is_empty());
        assert_eq!(line.snapshot().items, done.items);
    }

    #[test]
    fn hold_at_line_end_stops_belt_on_resting_front_item() {
        let cfg = LineConfig::default();
        let mut reg = ItemRegistry::new();
        let rear = reg.create_item(Vec3::new(-0.5, 0.0, 0.651), Quaternion::IDENTITY, "B0");
        let front = reg.create_item(Vec3::new(1.4, 0.0, 0.651), Quaternion::IDENTITY, "B0");
        reg.set_state(front, ItemState::AcceptedToEnd).unwrap();
        let gate = InspectionGate::new();
        let act = RejectActuator::new(&cfg);

        assert!(!belt_runs(&reg, &gate, &act, &cfg));

        let relaxed = LineConfig {
            hold_at_line_end: false,
            ..cfg.clone()
        };
        assert!(belt_runs(&reg, &gate, &act, &relaxed));

        // Only an exact match holds the belt.
        reg.set_position(front, Vec3::new(1.395, 0.0, 0.651)).unwrap();
        assert!(belt_runs(&reg, &gate, &act, &cfg));

        // A processed front item does not count.
        reg.set_position(front, Vec3::new(1.4, 0.0, 0.651)).unwrap();
        reg.set_state(front, ItemState::Processed).unwrap();
        assert!(belt_runs(&reg, &gate, &act, &cfg));
        assert_eq!(reg.get(rear).unwrap().state, ItemState::OnConveyor);
    }

    #[test]
    fn busy_pusher_stops_belt() {
        let cfg = LineConfig::default();
        let mut reg = ItemRegistry::new();
        let h = reg.create_item(Vec3::new(-0.5, 0.0, 0.651), Quaternion::IDENTITY, "B0");
        let gate = InspectionGate::new();
        let mut act = RejectActuator::new(&cfg);
        assert!(belt_runs(&reg, &gate, &act, &cfg));
        act.activate(h).unwrap();
        assert!(!belt_runs(&reg, &gate, &act, &cfg));
    }
}
