//! Allocation-free render path tests.
//!
//! The steady-state render path (rows with no notes, voices holding in
//! their sustain phase) must not touch the heap. Note dispatch is
//! allowed to allocate (it happens inside the lookahead, not under a
//! deadline), so these tests pin down the hot paths only.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use rt_engine::{EngineCore, InstrumentNode};
use rt_ir::{Envelope, Instrument, InstrumentId, Pattern};

const SR: u32 = 44100;

#[test]
fn empty_pattern_render_is_alloc_free() {
    let mut core = EngineCore::new(SR);
    core.set_pattern(Pattern::with_tempo(0, "", 120, 4, 8));
    core.play();

    let mut block = vec![0.0f32; 256];
    // Warm up once (first row events land in pre-sized queues)
    core.render(&mut block);

    assert_no_alloc(|| {
        for _ in 0..200 {
            core.render(&mut block);
        }
    });

    while core.pop_event().is_some() {}
}

#[test]
fn sustained_voice_render_is_alloc_free() {
    let mut inst = Instrument::new(InstrumentId::new(0).unwrap(), "pad");
    inst.envelope = Envelope::adsr(0.005, 0.01, 0.7, 0.1);
    let mut node = InstrumentNode::new(inst, SR as f32);
    node.note_on(60, 1.0, 0.0);
    node.note_on(67, 0.8, 0.0);

    let mut block = vec![0.0f32; 256];
    let mut t = 0.0;
    // Run into sustain before measuring
    for _ in 0..20 {
        node.render(&mut block, t);
        t += 128.0 / SR as f64;
    }

    assert_no_alloc(|| {
        for _ in 0..500 {
            node.render(&mut block, t);
            t += 128.0 / SR as f64;
        }
    });
}
