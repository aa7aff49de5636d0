//! Simulated ZVG peripheral and test doubles
//!
//! [`SimDevice`] models the board's side of the parallel cable: it watches
//! the control lines written through [`SimPort`] and answers on the status
//! lines the way the firmware does. [`SimClock`] advances one millisecond
//! per port read, so every bounded wait in the transport terminates.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use zvg_core::{Error, Result};
use zvg_hal::{BlockTransfer, Clock, DmaMemory, PhysicalAddress, PortIo};
use zvg_protocol::ExtendedCommand;

use crate::parport::regs::{dcr, dsr, ecr, reg, DCR_INVERT, DSR_INVERT};
use crate::ring::Transmit;

/// Port base used by the tests
pub const BASE: u16 = 0x378;

pub const ID_RECORD: &[u8] = b"MFG:Zektor;\r\nCMD:ZVG;\r\nMDL:ZVG-ISA;\r\n\
VER:0104,0100,0102;\r\nSWS:0A;\r\nESB:0000,0001;";

pub const MONITOR_BLOCK: [u8; 11] = [40, 2, 3, 4, 5, 6, 200, 128, 0, 0x34, 0x12];

pub const SPEED_TABLE: [u8; 4] = [10, 15, 20, 30];

/// Compatibility-mode idle status: PtrClk, XFlag and nDataAvail high
const COMPAT_IDLE: u8 = dsr::PTR_CLK | dsr::XFLAG | dsr::N_DATA_AVAIL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Negotiation answered; waiting for HostClk
    Negotiating(u8),
    Ecp,
    Nibble,
    Terminating,
}

pub type Shared = Rc<RefCell<SimDevice>>;

pub struct SimDevice {
    pub now: u64,
    /// ECR present at base + 0x402
    pub ecp_port: bool,
    pub powered: bool,
    /// Never answer a negotiation request
    pub refuse_negotiation: bool,
    /// Answer ECP negotiation with XFlag low
    pub ecp_unsupported: bool,
    /// Never answer a termination request
    pub stall_termination: bool,
    /// FIFO reports full and block transfers never reach terminal count
    pub fifo_stalled: bool,
    pub cnfg_a_locked: bool,
    pub cnfg_a: u8,
    pub cnfg_b: u8,
    pub device_id: Vec<u8>,
    /// Reply to a monitor read-back
    pub monitor: Vec<u8>,
    /// Reply to a speed table read-back
    pub speeds: Vec<u8>,
    /// Bytes received through the ECP FIFO, polled or block transfer
    pub fifo: Vec<u8>,
    /// Bytes strobed in compatibility mode
    pub spp: Vec<u8>,
    /// Extensibility bytes of every negotiation answered
    pub negotiations: Vec<u8>,
    pub transfers: usize,
    pub aborts: usize,
    data: u8,
    dcr: u8,
    status: u8,
    ecr: u8,
    phase: Phase,
    reverse: VecDeque<u8>,
    high_nibble: bool,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self {
            now: 0,
            ecp_port: true,
            powered: true,
            refuse_negotiation: false,
            ecp_unsupported: false,
            stall_termination: false,
            fifo_stalled: false,
            cnfg_a_locked: false,
            cnfg_a: 0x00,
            // DMA 3, IRQ 7, compression on
            cnfg_b: 0x80 | (1 << 3) | 0x03,
            device_id: ID_RECORD.to_vec(),
            monitor: MONITOR_BLOCK.to_vec(),
            speeds: SPEED_TABLE.to_vec(),
            fifo: Vec::new(),
            spp: Vec::new(),
            negotiations: Vec::new(),
            transfers: 0,
            aborts: 0,
            data: 0,
            dcr: dcr::HOST_BUSY | dcr::HOST_CLK | dcr::N_INIT,
            status: COMPAT_IDLE,
            ecr: ecr::SPP_IDLE,
            phase: Phase::Idle,
            reverse: VecDeque::new(),
            high_nibble: false,
        }
    }
}

impl SimDevice {
    pub fn ecr(&self) -> u8 {
        self.ecr
    }

    pub fn in_ecp(&self) -> bool {
        self.phase == Phase::Ecp
    }

    fn config_mode(&self) -> bool {
        self.ecr & ecr::MODE_MASK == ecr::MODE_CONFIG
    }

    fn read(&mut self, offset: u16) -> u8 {
        self.now += 1;
        match offset {
            reg::DATA => self.data,
            reg::DSR => {
                let status = if self.powered { self.status } else { 0 };
                status ^ DSR_INVERT
            }
            reg::DCR => self.dcr ^ DCR_INVERT,
            reg::CNFG_A if self.ecp_port && self.config_mode() => self.cnfg_a,
            reg::CNFG_B if self.ecp_port && self.config_mode() => self.cnfg_b,
            reg::ECR if self.ecp_port => {
                let fifo = if self.fifo_stalled {
                    ecr::FULL
                } else {
                    ecr::EMPTY
                };
                (self.ecr & !(ecr::FULL | ecr::EMPTY)) | fifo
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            reg::DATA => self.data = value,
            reg::DCR => self.control(value ^ DCR_INVERT),
            reg::ECR if self.ecp_port => self.ecr = value & !(ecr::FULL | ecr::EMPTY),
            reg::CNFG_A if self.ecp_port => match self.ecr & ecr::MODE_MASK {
                ecr::MODE_CONFIG if !self.cnfg_a_locked => self.cnfg_a = value,
                ecr::MODE_ECP => self.receive(value),
                _ => {}
            },
            reg::CNFG_B if self.ecp_port && self.config_mode() => self.cnfg_b = value,
            _ => {}
        }
    }

    /// React to a new logical DCR value
    fn control(&mut self, new: u8) {
        let old = self.dcr;
        self.dcr = new;
        if !self.powered {
            return;
        }
        let rose = new & !old;
        let fell = old & !new;

        if rose & dcr::ACTIVE_1284 != 0 {
            if new & dcr::HOST_BUSY == 0 && !self.refuse_negotiation {
                self.negotiations.push(self.data);
                self.phase = Phase::Negotiating(self.data);
                self.status = dsr::ACK_DATA_REQ | dsr::N_DATA_AVAIL | dsr::XFLAG;
            }
            return;
        }

        if fell & dcr::ACTIVE_1284 != 0 {
            match self.phase {
                Phase::Ecp | Phase::Nibble if self.stall_termination => {}
                Phase::Ecp | Phase::Nibble => {
                    self.phase = Phase::Terminating;
                    self.status &= !dsr::PTR_CLK;
                }
                _ => self.idle(),
            }
            return;
        }

        match self.phase {
            Phase::Negotiating(mode) if rose & dcr::HOST_CLK != 0 => self.accept(mode),
            // ECP setup: PeriphAck low, nAckReverse high
            Phase::Ecp if fell & dcr::HOST_ACK != 0 => {
                self.status = (self.status | dsr::ACK_DATA_REQ) & !dsr::BUSY;
            }
            Phase::Nibble if fell & dcr::HOST_BUSY != 0 => self.put_nibble(),
            Phase::Nibble if rose & dcr::HOST_BUSY != 0 => self.nibble_done(),
            Phase::Terminating if fell & dcr::HOST_BUSY != 0 => self.idle(),
            Phase::Idle if fell & dcr::HOST_CLK != 0 => {
                self.spp.push(self.data);
                self.status |= dsr::BUSY;
            }
            Phase::Idle if rose & dcr::HOST_CLK != 0 => self.status &= !dsr::BUSY,
            _ => {}
        }
    }

    fn accept(&mut self, mode: u8) {
        match mode {
            0x10 if !self.ecp_unsupported => {
                self.phase = Phase::Ecp;
                self.status = dsr::PTR_CLK | dsr::XFLAG | dsr::ACK_DATA_REQ | dsr::N_DATA_AVAIL;
            }
            0x00 | 0x04 => {
                if mode == 0x04 {
                    let len = (self.device_id.len() + 2) as u16;
                    self.reverse.clear();
                    self.reverse.extend(len.to_be_bytes());
                    self.reverse.extend(self.device_id.iter().copied());
                }
                self.phase = Phase::Nibble;
                self.high_nibble = false;
                self.status = dsr::PTR_CLK | self.data_avail_line();
            }
            // Refused mode: XFlag stays low
            _ => {
                self.phase = Phase::Nibble;
                self.reverse.clear();
                self.status = dsr::PTR_CLK | dsr::N_DATA_AVAIL;
            }
        }
    }

    fn data_avail_line(&self) -> u8 {
        if self.reverse.is_empty() {
            dsr::N_DATA_AVAIL
        } else {
            0
        }
    }

    fn idle(&mut self) {
        self.phase = Phase::Idle;
        self.high_nibble = false;
        self.status = dsr::PTR_CLK | dsr::XFLAG | self.data_avail_line();
    }

    fn put_nibble(&mut self) {
        let byte = self.reverse.front().copied().unwrap_or(0);
        let nibble = if self.high_nibble { byte >> 4 } else { byte & 0x0F };
        self.status = ((nibble & 0x07) << 3) | ((nibble & 0x08) << 4);
    }

    fn nibble_done(&mut self) {
        self.status |= dsr::PTR_CLK;
        if self.high_nibble {
            self.reverse.pop_front();
            self.status = dsr::PTR_CLK | self.data_avail_line();
        }
        self.high_nibble = !self.high_nibble;
    }

    /// Byte arriving through the ECP FIFO
    fn receive(&mut self, byte: u8) {
        if !self.powered || self.phase != Phase::Ecp {
            return;
        }
        self.fifo.push(byte);

        let reply = match ExtendedCommand::from_byte(byte) {
            Some(ExtendedCommand::ReadMonitor) => self.monitor.clone(),
            Some(ExtendedCommand::ReadSpeed) => self.speeds.clone(),
            _ => return,
        };
        self.reverse.extend(reply);
        // nPeriphRequest
        self.status &= !dsr::N_DATA_AVAIL;
    }
}

/// Create a device with its port and clock handles
pub fn device() -> (Shared, SimPort, SimClock) {
    let shared = Rc::new(RefCell::new(SimDevice::default()));
    (
        shared.clone(),
        SimPort(shared.clone()),
        SimClock(shared),
    )
}

pub struct SimPort(pub Shared);

impl PortIo for SimPort {
    fn read8(&mut self, addr: u16) -> u8 {
        match addr.checked_sub(BASE) {
            Some(offset) => self.0.borrow_mut().read(offset),
            None => 0xFF,
        }
    }

    fn write8(&mut self, addr: u16, value: u8) {
        if let Some(offset) = addr.checked_sub(BASE) {
            self.0.borrow_mut().write(offset, value);
        }
    }
}

pub struct SimClock(pub Shared);

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now
    }
}

/// Block-transfer engine wired straight into the device FIFO
///
/// Reaches terminal count immediately unless the FIFO is stalled.
pub struct SimDma(pub Shared);

impl BlockTransfer for SimDma {
    type Error = Error;

    fn start(&mut self, data: &[u8]) -> Result<()> {
        let mut device = self.0.borrow_mut();
        if device.ecr & (ecr::MODE_MASK | ecr::DMA_EN) != ecr::MODE_ECP | ecr::DMA_EN {
            return Err(Error::BadMode);
        }
        device.transfers += 1;
        if device.fifo_stalled {
            return Ok(());
        }
        for &byte in data {
            device.receive(byte);
        }
        device.ecr |= ecr::SERVICE_INTR;
        Ok(())
    }

    fn abort(&mut self) {
        self.0.borrow_mut().aborts += 1;
    }
}

/// Port that records every write and returns fixed reads
#[derive(Debug, Default)]
pub struct RecordingPort {
    pub writes: Vec<(u16, u8)>,
}

impl PortIo for RecordingPort {
    fn read8(&mut self, _addr: u16) -> u8 {
        0
    }

    fn write8(&mut self, addr: u16, value: u8) {
        self.writes.push((addr, value));
    }
}

/// Staging memory at a fixed physical address
pub struct FixedMemory {
    pub at: PhysicalAddress,
    pub staged: Vec<u8>,
    pub fail: bool,
}

impl FixedMemory {
    pub fn at(page: u8, offset: u16) -> Self {
        Self {
            at: PhysicalAddress { page, offset },
            staged: Vec::new(),
            fail: false,
        }
    }
}

impl DmaMemory for FixedMemory {
    type Error = ();

    fn stage(&mut self, data: &[u8]) -> core::result::Result<PhysicalAddress, ()> {
        if self.fail {
            return Err(());
        }
        self.staged = data.to_vec();
        Ok(self.at)
    }
}

/// Link that records transmitted blocks
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub sent: Vec<Vec<u8>>,
    pub flushes: usize,
    pub fail_with: Option<Error>,
}

impl Transmit for RecordingLink {
    fn transmit(&mut self, data: &[u8]) -> Result<()> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
