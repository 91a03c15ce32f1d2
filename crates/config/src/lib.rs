// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest region that still holds one 64-word burst.
const MIN_REGION_BYTES: u64 = 64 * 4;

/// First address past the 32-bit bus.
const ADDRESS_SPACE_END: u64 = 1 << 32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: String, // e.g. "128KiB"
}

impl MemoryRegion {
    pub fn size_bytes(&self) -> Result<u64> {
        parse_size(&self.size)
    }
}

/// CSR block offsets relative to `csr_base`, as assigned by the SoC builder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CsrBlocks {
    pub ctrl: u64,
    pub dma_burst: u64,
    pub uart: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    /// Data bytes are reversed on the way to the bus.
    #[default]
    Big,
    Little,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DmaConfig {
    #[serde(default)]
    pub endianness: Endianness,
    /// Clock cycles the Wishbone writer needs per word.
    #[serde(default = "default_cycles_per_word")]
    pub cycles_per_word: u32,
}

fn default_cycles_per_word() -> u32 {
    1
}

fn default_ticks_per_access() -> u32 {
    1
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self {
            endianness: Endianness::Big,
            cycles_per_word: default_cycles_per_word(),
        }
    }
}

/// Generated memory map of the SoC under test.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SocDescriptor {
    pub name: String,
    pub csr_base: u64,
    pub csr_blocks: CsrBlocks,
    pub main_ram: MemoryRegion,
    pub adc_sram: MemoryRegion,
    #[serde(default)]
    pub dma: DmaConfig,
    #[serde(default)]
    pub has_interrupts: bool,
    /// Peripheral clock ticks elapsed per CPU bus access.
    #[serde(default = "default_ticks_per_access")]
    pub ticks_per_access: u32,
}

impl Default for SocDescriptor {
    /// LiteX SoC on the ECP5 evaluation board.
    fn default() -> Self {
        Self {
            name: "ecp5-evn".to_string(),
            csr_base: 0xF000_0000,
            csr_blocks: CsrBlocks {
                ctrl: 0x0000,
                dma_burst: 0x0800,
                uart: 0x1000,
            },
            main_ram: MemoryRegion {
                base: 0x4000_0000,
                size: "32KiB".to_string(),
            },
            adc_sram: MemoryRegion {
                base: 0x3000_0000,
                size: "128KiB".to_string(),
            },
            dma: DmaConfig::default(),
            has_interrupts: true,
            ticks_per_access: default_ticks_per_access(),
        }
    }
}

impl SocDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open SoC descriptor at {:?}", path.as_ref()))?;
        let desc: Self =
            serde_yaml::from_reader(f).context("Failed to parse SoC descriptor")?;
        desc.validate()?;
        Ok(desc)
    }

    pub fn validate(&self) -> Result<()> {
        let mut spans = Vec::new();
        for (name, region) in [("main_ram", &self.main_ram), ("adc_sram", &self.adc_sram)] {
            let size = region
                .size_bytes()
                .with_context(|| format!("Region '{}' has an invalid size", name))?;
            if size < MIN_REGION_BYTES {
                anyhow::bail!(
                    "Region '{}' is {} bytes; at least {} are needed",
                    name,
                    size,
                    MIN_REGION_BYTES
                );
            }
            if region.base % 4 != 0 {
                anyhow::bail!("Region '{}' base {:#x} is not word aligned", name, region.base);
            }
            let end = region
                .base
                .checked_add(size)
                .filter(|&end| end <= ADDRESS_SPACE_END);
            let Some(end) = end else {
                anyhow::bail!("Region '{}' does not fit a 32-bit address space", name);
            };
            spans.push((name, region.base, end));
        }

        let csr_end = self
            .csr_span()
            .and_then(|span| self.csr_base.checked_add(span))
            .filter(|&end| end <= ADDRESS_SPACE_END);
        let Some(csr_end) = csr_end else {
            anyhow::bail!("CSR blocks do not fit a 32-bit address space");
        };
        spans.push(("csr", self.csr_base, csr_end));

        for (i, a) in spans.iter().enumerate() {
            for b in &spans[i + 1..] {
                if a.1 < b.2 && b.1 < a.2 {
                    anyhow::bail!("Regions '{}' and '{}' overlap", a.0, b.0);
                }
            }
        }

        let blocks = [
            ("ctrl", self.csr_blocks.ctrl),
            ("dma_burst", self.csr_blocks.dma_burst),
            ("uart", self.csr_blocks.uart),
        ];
        for (i, (name, offset)) in blocks.iter().enumerate() {
            if offset % CSR_BLOCK_SIZE != 0 {
                anyhow::bail!(
                    "CSR block '{}' offset {:#x} is not {:#x} aligned",
                    name,
                    offset,
                    CSR_BLOCK_SIZE
                );
            }
            if blocks[i + 1..].iter().any(|(_, other)| other == offset) {
                anyhow::bail!("CSR block '{}' shares its offset with another block", name);
            }
        }

        if self.dma.cycles_per_word == 0 {
            anyhow::bail!("DMA 'cycles_per_word' must be greater than zero");
        }
        if self.ticks_per_access == 0 {
            anyhow::bail!("'ticks_per_access' must be greater than zero");
        }

        Ok(())
    }

    /// Address range covered by all CSR blocks, `None` if it overflows.
    pub fn csr_span(&self) -> Option<u64> {
        let last = self
            .csr_blocks
            .ctrl
            .max(self.csr_blocks.dma_burst)
            .max(self.csr_blocks.uart);
        last.checked_add(CSR_BLOCK_SIZE)
    }
}

/// Address space given to each CSR block.
pub const CSR_BLOCK_SIZE: u64 = 0x800;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    /// SoC descriptor; the built-in ECP5 map when absent.
    #[serde(default)]
    pub system: Option<String>,
    /// Bytes typed into the UART. Use `\r` or `\n` to end lines.
    pub uart_input: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    /// Console service calls before giving up.
    pub max_steps: u64,
    /// Bound on the DMA ready poll; the runner picks a finite default when absent.
    #[serde(default)]
    pub max_polls: Option<u32>,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All input consumed and the console went idle.
    InputExhausted,
    /// Software wrote the reset controller.
    Reset,
    MaxSteps,
    WallTime,
    BusError,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartNotContainsAssertion {
    pub uart_not_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DmaTimeoutsAssertion {
    pub dma_timeouts: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    UartContains(UartContainsAssertion),
    UartNotContains(UartNotContainsAssertion),
    ExpectedStopReason(StopReasonAssertion),
    DmaTimeouts(DmaTimeoutsAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if let Some(system) = &self.inputs.system {
            if system.trim().is_empty() {
                anyhow::bail!("Input 'system' path cannot be empty");
            }
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        if self.limits.max_polls == Some(0) {
            anyhow::bail!("Limit 'max_polls' must be greater than zero");
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
