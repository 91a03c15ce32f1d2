// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::metrics::AccessMetrics;
    use crate::session::{RunLimits, Session};
    use crate::{Bus, Machine, SimulationError};
    use socdiag_config::{DmaConfig, Endianness, SocDescriptor, StopReason};
    use socdiag_console::hal::{Csr, Region, Soc};
    use socdiag_console::PollLimit;
    use std::sync::Arc;
    use std::time::Duration;

    fn limits() -> RunLimits {
        RunLimits {
            max_steps: 10_000,
            wall_time: None,
        }
    }

    fn session_with(desc: &SocDescriptor, limit: PollLimit) -> Session {
        Session::new(Machine::from_config(desc).unwrap(), limit)
    }

    fn readback(values: impl Fn(usize) -> u32) -> String {
        let mut out = String::from("wishbone burst test...\nwaiting for ready!\nmemory readback!\n");
        for i in 0..64 {
            out.push_str(&format!("memory[{}]: {}\n", i, values(i)));
        }
        out
    }

    #[test]
    fn test_boot_banner_and_interrupts() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.boot("test-build").unwrap();

        let out = session.output();
        assert!(out.starts_with("\nCPU testing software built test-build\n\nAvailable commands:\n"));
        assert!(out.ends_with("RUNTIME>"));

        let m = session.soc().machine();
        assert!(m.irq_enabled);
        assert_eq!(m.irq_mask, 0);
    }

    #[test]
    fn test_wishbone_end_to_end() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"wishbone\r").unwrap();
        let summary = session.run(&limits());

        assert_eq!(summary.stop_reason, StopReason::InputExhausted);
        assert_eq!(summary.commands, vec!["wishbone".to_string()]);
        assert_eq!(summary.dma_timeouts, 0);

        let expected = format!("wishbone\n{}RUNTIME>", readback(|_| 0));
        assert_eq!(session.output(), expected);

        let m = session.soc().machine();
        assert_eq!(m.cache_flushes, 1);
        assert_eq!(m.dma().unwrap().bursts_completed(), 1);
        assert_eq!(m.bus.read_u32(m.csr_address(Csr::DmaBurstSize)).unwrap(), 64);
        assert_eq!(m.bus.read_u32(m.csr_address(Csr::DmaBase)).unwrap(), 0x3000_0000);
    }

    #[test]
    fn test_second_burst_reads_next_pass_byte_swapped() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"wishbone\rwishbone\r").unwrap();
        let summary = session.run(&limits());
        assert_eq!(summary.commands.len(), 2);

        let out = session.output();
        assert!(out.ends_with(&format!("{}RUNTIME>", readback(|_| 0x0100_0000))));
    }

    #[test]
    fn test_little_endian_writer() {
        let mut desc = SocDescriptor::default();
        desc.dma = DmaConfig {
            endianness: Endianness::Little,
            cycles_per_word: 2,
        };
        let mut session = session_with(&desc, PollLimit::Polls(1000));
        session.push_input(b"wishbone\nwishbone\n").unwrap();
        session.run(&limits());
        assert!(session.output().contains("memory[63]: 1\nRUNTIME>"));
    }

    #[test]
    fn test_workaround_touches_main_ram_first() {
        let metrics = Arc::new(AccessMetrics::new());
        let mut machine = Machine::new();
        machine.observers.push(metrics.clone());

        let mut session = Session::new(machine, PollLimit::Polls(1000));
        session.push_input(b"workaround\r").unwrap();
        let summary = session.run(&limits());
        assert_eq!(summary.commands, vec!["workaround".to_string()]);

        let report = metrics.report();
        assert_eq!(report.memory_reads, 128);
        assert_eq!(report.csr_writes, 4);
        assert_eq!(report.dma_transfers, 64);
        assert!(report.ready_polls >= 1);

        let expected = format!(
            "workaround\nwishbone burst test with workaround...\n{}RUNTIME>",
            readback(|_| 0)
        );
        assert_eq!(session.output(), expected);
    }

    #[test]
    fn test_reboot_stops_run() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"reboot\rhelp\r").unwrap();
        let summary = session.run(&limits());

        assert_eq!(summary.stop_reason, StopReason::Reset);
        assert_eq!(summary.commands, vec!["reboot".to_string()]);
        assert_eq!(session.input_pending(), 5);

        let mut m = session.soc().machine_mut();
        assert_eq!(m.ctrl().unwrap().reset_requests(), 1);
        m.reset();
        assert!(!m.reset_requested());
    }

    #[test]
    fn test_slow_dma_times_out_and_console_recovers() {
        let mut desc = SocDescriptor::default();
        desc.dma.cycles_per_word = 1000;
        let mut session = session_with(&desc, PollLimit::Polls(10));
        session.push_input(b"wishbone\rhelp\r").unwrap();
        let summary = session.run(&limits());

        assert_eq!(summary.stop_reason, StopReason::InputExhausted);
        assert_eq!(summary.dma_timeouts, 1);
        assert_eq!(
            summary.commands,
            vec!["wishbone".to_string(), "help".to_string()]
        );
        let out = session.output();
        assert!(out.contains("waiting for ready!\ndma timeout: ready not asserted after 10 polls\nRUNTIME>help\n"));
        assert!(!out.contains("memory readback!"));
    }

    #[test]
    fn test_unknown_command_only_prompts() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"xyz\r").unwrap();
        let summary = session.run(&limits());
        assert!(summary.commands.is_empty());
        assert_eq!(session.output(), "xyz\nRUNTIME>");
    }

    #[test]
    fn test_max_steps_and_wall_time() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"help").unwrap();
        let summary = session.run(&RunLimits {
            max_steps: 2,
            wall_time: None,
        });
        assert_eq!(summary.stop_reason, StopReason::MaxSteps);
        assert_eq!(summary.steps, 2);

        let summary = session.run(&RunLimits {
            max_steps: 100,
            wall_time: Some(Duration::ZERO),
        });
        assert_eq!(summary.stop_reason, StopReason::WallTime);
    }

    #[test]
    fn test_bus_rejects_unmapped_and_unaligned() {
        let mut m = Machine::new();
        assert!(matches!(
            m.bus.read_u32(0x1000_0000),
            Err(SimulationError::MemoryViolation(0x1000_0000))
        ));
        assert!(matches!(
            m.bus.write_u32(0x4000_0002, 1),
            Err(SimulationError::UnalignedAccess(0x4000_0002))
        ));
        m.bus.write_u32(0x4000_0010, 0xAABB_CCDD).unwrap();
        assert_eq!(m.bus.main_ram.read_u8(0x4000_0010), Some(0xDD));
    }

    #[test]
    fn test_dma_outside_memory_is_dropped() {
        let mut m = Machine::new();
        let size = m.csr_address(Csr::DmaBurstSize);
        let base = m.csr_address(Csr::DmaBase);
        let start = m.csr_address(Csr::DmaStart);
        m.bus.write_u32(size, 2).unwrap();
        m.bus.write_u32(base, 0x1000_0000).unwrap();
        m.bus.write_u32(start, 1).unwrap();
        m.tick(3);
        assert_eq!(m.bus.dropped_transfers, 2);
    }

    #[test]
    fn test_sim_soc_reads_regions() {
        let mut machine = Machine::new();
        machine
            .bus
            .region_mut(Region::MainRam)
            .load_words(0x4000_0000, &[11, 22, 33]);
        let session = Session::new(machine, PollLimit::Unbounded);
        let mut soc = session.soc().clone();
        assert_eq!(soc.region_base(Region::MainRam), 0x4000_0000);
        assert_eq!(soc.read_word(Region::MainRam, 2).unwrap(), 33);
        assert_eq!(soc.read_csr(Csr::DmaReady).unwrap(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut session = Session::new(Machine::new(), PollLimit::Polls(1000));
        session.push_input(b"wishbone\n").unwrap();
        session.run(&limits());

        let snapshot = session.soc().machine().snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["name"], "ecp5-evn");
        assert_eq!(value["peripherals"]["dma_burst"]["state"], "wait_for_trigger");
        assert_eq!(value["peripherals"]["dma_burst"]["pass_count"], 1);
        assert_eq!(value["adc_sram_head"].as_array().unwrap().len(), 64);
    }
}
