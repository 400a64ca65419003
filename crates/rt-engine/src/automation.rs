//! Scheduled parameter automation.
//!
//! A `ParamTimeline` holds the committed automation for one audio
//! parameter: step changes and linear ramps at absolute engine times.
//! Envelopes are compiled into timeline segments at note-on/note-off, and
//! the render path samples the timeline as time advances. Instrument
//! edits rescale the committed values in place instead of re-issuing them.

#[derive(Clone, Copy, Debug, PartialEq)]
enum SegmentKind {
    /// Step to `value` at `time`.
    Set,
    /// Ramp linearly from the previous point, arriving at `value` at `time`.
    Ramp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Segment {
    time: f64,
    value: f32,
    kind: SegmentKind,
}

/// Automation events for a single parameter, sorted by time.
#[derive(Clone, Debug)]
pub struct ParamTimeline {
    initial: f32,
    events: Vec<Segment>,
}

impl ParamTimeline {
    pub fn new(initial: f32) -> Self {
        Self { initial, events: Vec::with_capacity(8) }
    }

    /// Drop all events and settle at `value`.
    pub fn clear_to(&mut self, value: f32) {
        self.events.clear();
        self.initial = value;
    }

    fn insert(&mut self, segment: Segment) {
        let idx = self.events.partition_point(|e| e.time <= segment.time);
        self.events.insert(idx, segment);
    }

    /// Schedule a step to `value` at `time`.
    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Segment { time, value, kind: SegmentKind::Set });
    }

    /// Schedule a linear ramp arriving at `value` at `time`, starting from
    /// the previous scheduled point.
    pub fn ramp_to(&mut self, value: f32, time: f64) {
        self.insert(Segment { time, value, kind: SegmentKind::Ramp });
    }

    /// Remove every event strictly after `time`.
    pub fn cancel_after(&mut self, time: f64) {
        self.events.retain(|e| e.time <= time);
    }

    /// Pin the current value as a step at `time`. Call before scheduling a
    /// release so the ramp starts from where the envelope actually is.
    pub fn anchor(&mut self, time: f64) {
        let value = self.value_at(time);
        self.set_value_at(value, time);
    }

    /// Multiply the resting value and every scheduled value by `factor`.
    pub fn scale_values(&mut self, factor: f32) {
        self.initial *= factor;
        for event in &mut self.events {
            event.value *= factor;
        }
    }

    /// Sample the timeline at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let idx = self.events.partition_point(|e| e.time <= time);
        let (prev_time, prev_value) = if idx == 0 {
            (f64::NEG_INFINITY, self.initial)
        } else {
            let prev = self.events[idx - 1];
            (prev.time, prev.value)
        };

        if let Some(next) = self.events.get(idx) {
            if next.kind == SegmentKind::Ramp {
                if prev_time.is_finite() && next.time > prev_time {
                    let t = ((time - prev_time) / (next.time - prev_time)) as f32;
                    return prev_value + (next.value - prev_value) * t.clamp(0.0, 1.0);
                }
                // Ramp with no start point behaves as a step at its time.
            }
        }
        prev_value
    }

    /// The value the timeline settles at after all scheduled events.
    pub fn final_value(&self) -> f32 {
        self.events.last().map_or(self.initial, |e| e.value)
    }

    pub fn is_quiescent(&self) -> bool {
        self.events.is_empty()
    }
}
