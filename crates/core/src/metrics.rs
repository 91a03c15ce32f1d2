// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use serde::Serialize;
use socdiag_console::hal::{Csr, Region};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts bus traffic generated by the console.
#[derive(Debug, Default)]
pub struct AccessMetrics {
    csr_reads: AtomicU64,
    csr_writes: AtomicU64,
    ready_polls: AtomicU64,
    memory_reads: AtomicU64,
    ticks: AtomicU64,
    dma_transfers: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub csr_reads: u64,
    pub csr_writes: u64,
    pub ready_polls: u64,
    pub memory_reads: u64,
    pub ticks: u64,
    pub dma_transfers: u64,
}

impl AccessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        for counter in [
            &self.csr_reads,
            &self.csr_writes,
            &self.ready_polls,
            &self.memory_reads,
            &self.ticks,
            &self.dma_transfers,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            csr_reads: self.csr_reads.load(Ordering::SeqCst),
            csr_writes: self.csr_writes.load(Ordering::SeqCst),
            ready_polls: self.ready_polls.load(Ordering::SeqCst),
            memory_reads: self.memory_reads.load(Ordering::SeqCst),
            ticks: self.ticks.load(Ordering::SeqCst),
            dma_transfers: self.dma_transfers.load(Ordering::SeqCst),
        }
    }
}

impl SimulationObserver for AccessMetrics {
    fn on_csr_read(&self, csr: Csr, _value: u32) {
        self.csr_reads.fetch_add(1, Ordering::SeqCst);
        if csr == Csr::DmaReady {
            self.ready_polls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_csr_write(&self, _csr: Csr, _value: u32) {
        self.csr_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_memory_read(&self, _region: Region, _addr: u64) {
        self.memory_reads.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tick(&self, transfers: usize) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.dma_transfers
            .fetch_add(transfers as u64, Ordering::SeqCst);
    }
}
