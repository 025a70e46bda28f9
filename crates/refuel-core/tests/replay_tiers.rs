//! # Replay Tier Tests (T0-T3)
//!
//! If ANY tier fails, recorded shuffles cannot be trusted to replay.
//!
//! ## Tiers
//! - T0: History Codecs
//! - T1: Chain Reconstruction
//! - T2: Swap Primitives
//! - T3: Record, Serialize, Replay

use refuel_core::{
    Assembly, AssemblyId, Block, Core, CoreStore, Flags, FuelHandler, Location, MoveRecord,
    OutagePlan, RefuelError, ScheduledShuffle, ShuffleSequence, SwapExecutor,
    build_ring_schedule, process_move_list,
};

fn fuel(name: &str, burnup: f64) -> Assembly {
    let mut a = Assembly::new(AssemblyId(0), name, "feed fuel", Flags::from_names(["fuel"]));
    a.blocks = vec![
        Block::new(format!("{name}-plate"), Flags::from_names(["grid plate"]), 10.0),
        Block::new(format!("{name}-f1"), Flags::from_names(["fuel"]), 60.0).with_enrichment(10.0),
        Block::new(format!("{name}-f2"), Flags::from_names(["fuel"]), 110.0).with_enrichment(12.0),
    ];
    a.set_param("burnup", burnup);
    a
}

/// Rings 1..=4, ring r holds r assemblies named `R{r}P{p}`.
fn reference_core() -> Core {
    let mut core = Core::new(4);
    core.register_template(fuel("template", 0.0));
    for ring in 1..=4u32 {
        for pos in 1..=ring {
            let burnup = f64::from(ring * 10 + pos);
            core.add_assembly(fuel(&format!("R{ring}P{pos}"), burnup), Location::grid(ring, pos))
                .expect("add");
        }
    }
    core
}

// =============================================================================
// TIER T0: HISTORY CODECS
// =============================================================================

mod t0_codecs {
    use super::*;
    use refuel_core::{parse_legacy, parse_yaml, write_legacy};

    /// T0.1: Both formats describe the same cascade identically.
    #[test]
    fn legacy_and_yaml_agree() {
        let yaml = r#"
sequence:
  1:
    - cascade: ["feed fuel", "001-001", "002-001", "003-001"]
      fuelEnrichment: [4.5, 5.5]
"#;
        let legacy = "\
Before cycle 1:
LoadQueue moved to 001-001 with assembly type feed fuel with enrich list: 4.5 5.5
001-001 moved to 002-001 with enrich list:
002-001 moved to 003-001 with enrich list:
003-001 moved to SFP with enrich list:
";
        let from_yaml = parse_yaml(yaml).expect("yaml");
        let from_text = parse_legacy(legacy).expect("text");
        assert_eq!(from_yaml, from_text);
    }

    /// T0.2: Cycle 0 is rejected by both readers.
    #[test]
    fn cycle_zero_rejected() {
        assert!(matches!(
            parse_yaml("sequence:\n  0: []\n"),
            Err(RefuelError::ReservedCycle)
        ));
        assert!(matches!(
            parse_legacy("Before cycle 0:\n"),
            Err(RefuelError::ReservedCycle)
        ));
    }

    /// T0.3: Written text is stable under a second round trip.
    #[test]
    fn legacy_text_is_stable() {
        let mut seq = ShuffleSequence::new();
        seq.set_cycle(
            1,
            vec![
                MoveRecord::new(Location::grid(2, 1), Location::Sfp).with_type("feed fuel"),
                MoveRecord::new(Location::LoadQueue, Location::grid(2, 1))
                    .with_type("feed fuel")
                    .with_enrichment(vec![1.25, 2.5]),
            ],
        );
        let once = write_legacy(&seq).expect("write");
        let twice = write_legacy(&parse_legacy(&once).expect("parse")).expect("write");
        assert_eq!(once, twice);
    }
}

// =============================================================================
// TIER T1: CHAIN RECONSTRUCTION
// =============================================================================

mod t1_chains {
    use super::*;

    /// T1.1: A four-record cascade yields one load chain in move order.
    #[test]
    fn cascade_becomes_load_chain() {
        let (a, b, c) = (Location::grid(1, 1), Location::grid(2, 1), Location::grid(3, 1));
        let moves = vec![
            MoveRecord::new(a, b),
            MoveRecord::new(b, c),
            MoveRecord::new(c, Location::Sfp),
            MoveRecord::new(Location::LoadQueue, a)
                .with_enrichment(vec![1.0])
                .with_type("fuel"),
        ];
        let processed = process_move_list(&moves).expect("process");
        assert_eq!(processed.load_chains[0].locations, vec![a, b, c]);
        assert_eq!(
            processed.load_chains[0].charge.assem_type.as_deref(),
            Some("fuel")
        );
    }

    /// T1.2: Every moved location lands in exactly one chain.
    #[test]
    fn every_location_in_one_chain() {
        let moves = vec![
            MoveRecord::new(Location::grid(1, 1), Location::grid(2, 1)),
            MoveRecord::new(Location::grid(2, 1), Location::Sfp),
            MoveRecord::new(Location::LoadQueue, Location::grid(1, 1)).with_type("fuel"),
            MoveRecord::new(Location::grid(3, 1), Location::grid(3, 2)),
            MoveRecord::new(Location::grid(3, 2), Location::grid(3, 1)),
        ];
        let processed = process_move_list(&moves).expect("process");
        let total: usize = processed
            .load_chains
            .iter()
            .map(|c| c.locations.len())
            .chain(processed.loop_chains.iter().map(Vec::len))
            .sum();
        assert_eq!(total, processed.visited.len());
        assert_eq!(total, 4);
    }
}

// =============================================================================
// TIER T2: SWAP PRIMITIVES
// =============================================================================

mod t2_swaps {
    use super::*;

    /// T2.1: Grid plates stay at their location through a swap.
    #[test]
    fn stationary_blocks_follow_location() {
        let mut core = reference_core();
        let a = core.assembly_at(&Location::grid(1, 1)).expect("a");
        let b = core.assembly_at(&Location::grid(2, 1)).expect("b");

        let mut exec = SwapExecutor::new(&mut core, Flags::from_names(["grid plate"]));
        exec.swap_assemblies(Some(a), Some(b)).expect("swap");
        drop(exec);

        let at_center = core.assembly_at(&Location::grid(1, 1)).expect("center");
        assert_eq!(at_center, b);
        assert_eq!(core.assembly(b).expect("b").blocks[0].name, "R1P1-plate");
        assert_eq!(core.assembly(b).expect("b").blocks[1].name, "R2P1-f1");
    }

    /// T2.2: Discharged assemblies go to the pool with their multiplicity.
    #[test]
    fn discharge_updates_pool() {
        let mut core = reference_core();
        core.set_symmetric_equivalents(Location::grid(4, 1), 5);
        let out = core.assembly_at(&Location::grid(4, 1)).expect("out");
        let fresh = core.create_assembly("feed fuel", &[]).expect("fresh");

        let mut exec = SwapExecutor::new(&mut core, Flags::new());
        exec.discharge_swap(Some(fresh), Some(out)).expect("discharge");
        drop(exec);

        assert!(core.sfp_list().contains(&out));
        assert_eq!(core.assembly(out).expect("out").multiplicity, 6);
        assert_eq!(core.assembly_at(&Location::grid(4, 1)), Some(fresh));
    }
}

// =============================================================================
// TIER T3: RECORD, SERIALIZE, REPLAY
// =============================================================================

mod t3_replay {
    use super::*;
    use refuel_core::{read_path, write_legacy_file, write_yaml_file};

    fn run_strategy(core: &mut Core, cycle: u32) -> ShuffleSequence {
        let schedule = build_ring_schedule(4, None, None, None, None, 0.0).expect("schedule");
        let mut logic = ScheduledShuffle::new(schedule, "feed fuel")
            .ranked_by("burnup", 100.0)
            .with_enrichment(vec![15.0, 16.0]);
        let report = FuelHandler::new(core, cycle, Flags::from_names(["grid plate"]))
            .outage(OutagePlan::Strategy(&mut logic))
            .expect("outage");
        let mut seq = ShuffleSequence::new();
        report.record_into(&mut seq);
        seq
    }

    fn replay(seq: &ShuffleSequence) -> Core {
        let mut core = reference_core();
        FuelHandler::new(&mut core, 1, Flags::from_names(["grid plate"]))
            .outage(OutagePlan::Repeat(seq))
            .expect("replay");
        core
    }

    /// T3.1: Replaying the legacy file reproduces the recorded layout.
    #[test]
    fn legacy_replay_reproduces_layout() {
        let mut original = reference_core();
        let seq = run_strategy(&mut original, 1);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("case-SHUFFLES.txt");
        write_legacy_file(&path, &seq).expect("write");
        let loaded = read_path(&path).expect("read");

        let replayed = replay(&loaded);
        assert_eq!(original.layout(), replayed.layout());
    }

    /// T3.2: Replaying the YAML file reproduces the recorded layout.
    #[test]
    fn yaml_replay_reproduces_layout() {
        let mut original = reference_core();
        let seq = run_strategy(&mut original, 1);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shuffles.yaml");
        write_yaml_file(&path, &seq).expect("write");
        let loaded = read_path(&path).expect("read");

        let replayed = replay(&loaded);
        assert_eq!(original.layout(), replayed.layout());
        let fresh = replayed
            .assembly_at(&Location::grid(4, 4))
            .and_then(|id| replayed.assembly(id))
            .map(Assembly::enrich_list);
        assert_eq!(fresh, Some(vec![15.0, 16.0]));
    }

    /// T3.3: Replaying a cycle the file does not hold fails fast.
    #[test]
    fn replay_of_absent_cycle_fails() {
        let mut core = reference_core();
        let seq = ShuffleSequence::new();
        let result = FuelHandler::new(&mut core, 3, Flags::new()).outage(OutagePlan::Repeat(&seq));
        assert!(matches!(result, Err(RefuelError::CycleNotFound(3))));
    }
}
