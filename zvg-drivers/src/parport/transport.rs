//! IEEE-1284 link transport
//!
//! Drives an ECP-capable parallel port through the 1284 handshakes the ZVG
//! understands:
//!
//! - ECP forward mode for command streaming, with the port hardware doing
//!   the byte handshake through its FIFO (polled or block transfer)
//! - reverse nibble mode for reading status and identification data, one
//!   nibble per handshake
//! - plain compatibility (SPP) strobes
//!
//! Every wait on a status line is a bounded poll against the [`Clock`];
//! a peripheral that stops answering yields an error, never a hang.
//!
//! # Line protocol
//!
//! Negotiation:
//! 1. extensibility byte on the data lines, 1284Active high, HostBusy low
//! 2. peripheral answers with PtrClk low and AckDataReq/nDataAvail/XFlag high
//! 3. host pulses HostClk and raises HostBusy
//! 4. peripheral raises PtrClk; XFlag tells whether the mode was accepted
//!
//! Termination:
//! 1. 1284Active low, HostBusy high
//! 2. peripheral drops PtrClk, host drops HostBusy
//! 3. peripheral raises PtrClk, host raises HostBusy and nInit

use log::{debug, trace, warn};
use zvg_core::config::{ChipsetInfo, Timeouts};
use zvg_core::state::{LinkEvent, LinkState, NegotiationMode};
use zvg_core::{Error, Result};
use zvg_hal::{BlockTransfer, Clock, PortIo};

use super::regs::{
    dcr, dsr, ecr, reg, CNFG_A_PWORD_8BIT, CNFG_A_PWORD_MASK, CNFG_B_COMPRESS, DCR_INVERT,
    DSR_INVERT, IRQ_LOOKUP,
};

/// Lines that must stay high while the peripheral is in ECP forward mode
const ECP_ALIVE: u8 = dsr::XFLAG | dsr::PTR_CLK;

/// ECP transport over a parallel port
pub struct EcpTransport<P, C> {
    io: P,
    clock: C,
    base: u16,
    timeouts: Timeouts,
    link: LinkState,
    /// Raw DCR value last written
    dcr: u8,
    /// Termination handshakes that had to be forced
    forced_terminations: u32,
}

impl<P: PortIo, C: Clock> EcpTransport<P, C> {
    /// Create a transport for the port at `base`
    ///
    /// No I/O is performed until [`detect`](Self::detect) or the first
    /// transfer.
    pub fn new(io: P, clock: C, base: u16, timeouts: Timeouts) -> Self {
        Self {
            io,
            clock,
            base,
            timeouts,
            link: LinkState::Compatibility,
            dcr: (dcr::HOST_BUSY | dcr::HOST_CLK | dcr::N_INIT) ^ DCR_INVERT,
            forced_terminations: 0,
        }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    /// Number of terminations the peripheral did not complete
    pub fn forced_terminations(&self) -> u32 {
        self.forced_terminations
    }

    /// Release the port and clock
    pub fn into_parts(self) -> (P, C) {
        (self.io, self.clock)
    }

    // Register access

    fn read(&mut self, offset: u16) -> u8 {
        self.io.read8(self.base + offset)
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.io.write8(self.base + offset, value);
    }

    fn read_dsr(&mut self) -> u8 {
        self.read(reg::DSR) ^ DSR_INVERT
    }

    fn read_ecr(&mut self) -> u8 {
        self.read(reg::ECR)
    }

    fn write_ecr(&mut self, value: u8) {
        self.write(reg::ECR, value);
    }

    fn modify_ecr<F: FnOnce(u8) -> u8>(&mut self, f: F) {
        let base = self.base;
        self.io.modify8(base + reg::ECR, f);
    }

    fn flush_dcr(&mut self) {
        let value = self.dcr;
        self.write(reg::DCR, value);
    }

    /// Assert logical DCR lines
    fn set_dcr(&mut self, bits: u8) {
        self.dcr |= bits;
        self.dcr ^= DCR_INVERT & bits;
        self.flush_dcr();
    }

    /// Deassert logical DCR lines
    fn clear_dcr(&mut self, bits: u8) {
        self.dcr &= !bits;
        self.dcr ^= DCR_INVERT & bits;
        self.flush_dcr();
    }

    /// Assert and deassert lines in a single write
    fn set_clear_dcr(&mut self, set: u8, clear: u8) {
        self.dcr |= set;
        self.dcr &= !clear;
        self.dcr ^= DCR_INVERT & (set | clear);
        self.flush_dcr();
    }

    /// Write all logical DCR lines
    fn write_dcr(&mut self, bits: u8) {
        self.dcr = bits ^ DCR_INVERT;
        self.flush_dcr();
    }

    /// Poll the status lines until `(dsr & mask) == value` matches `equal`
    ///
    /// Returns the status that satisfied the condition, or `None` after
    /// `timeout_ms`.
    fn wait_dsr(&mut self, mask: u8, value: u8, equal: bool, timeout_ms: u32) -> Option<u8> {
        let start = self.clock.now_ms();
        loop {
            let status = self.read_dsr();
            if ((status & mask) == value) == equal {
                return Some(status);
            }
            if self.clock.elapsed_ms(start) >= u64::from(timeout_ms) {
                return None;
            }
        }
    }

    fn wait_dsr_eq(&mut self, mask: u8, value: u8, timeout_ms: u32) -> Option<u8> {
        self.wait_dsr(mask, value, true, timeout_ms)
    }

    fn wait_dsr_ne(&mut self, mask: u8, value: u8, timeout_ms: u32) -> Option<u8> {
        self.wait_dsr(mask, value, false, timeout_ms)
    }

    fn wait_ecr_eq(&mut self, mask: u8, value: u8, timeout_ms: u32) -> bool {
        let start = self.clock.now_ms();
        loop {
            if self.read_ecr() & mask == value {
                return true;
            }
            if self.clock.elapsed_ms(start) >= u64::from(timeout_ms) {
                return false;
            }
        }
    }

    // Detection

    /// Probe for an ECP port at the base address
    ///
    /// Checks the FIFO status bits, verifies the ECR is really an ECR,
    /// selects 8-bit PWord and turns off RLE compression. Returns the DMA
    /// channel and IRQ the chipset reports. The port is left in SPP mode
    /// with the control lines in compatibility state.
    pub fn detect(&mut self) -> Result<ChipsetInfo> {
        let status = self.read_ecr();
        if status & (ecr::FULL | ecr::EMPTY) != ecr::EMPTY {
            debug!("no ECR at {:#x} (read {:#04x})", self.base, status);
            return Err(Error::NotEcp);
        }

        // EMPTY is read-only on a real ECR
        self.write_ecr(ecr::PROBE);
        if self.read_ecr() != ecr::PROBE | ecr::EMPTY {
            debug!("ECR at {:#x} did not hold probe value", self.base);
            return Err(Error::NotEcp);
        }

        self.write_ecr(ecr::CONFIG);
        let mut cnfg_a = self.read(reg::CNFG_A);
        let cnfg_b = self.read(reg::CNFG_B);

        let mut result = Ok(());
        if cnfg_a & CNFG_A_PWORD_MASK != CNFG_A_PWORD_8BIT {
            cnfg_a = (cnfg_a & !CNFG_A_PWORD_MASK) | CNFG_A_PWORD_8BIT;
            self.write(reg::CNFG_A, cnfg_a);
            if self.read(reg::CNFG_A) != cnfg_a {
                warn!("ECP port at {:#x} refused 8-bit PWord", self.base);
                result = Err(Error::EcpConfigWord);
            }
        }

        let chipset = ChipsetInfo {
            dma: cnfg_b & 0x07,
            irq: IRQ_LOOKUP[usize::from((cnfg_b >> 3) & 0x07)],
        };
        self.write(reg::CNFG_B, cnfg_b & !CNFG_B_COMPRESS);

        self.write_ecr(ecr::SPP_IDLE);
        self.compatibility();

        debug!(
            "ECP port at {:#x}: chipset DMA {}, IRQ {}",
            self.base, chipset.dma, chipset.irq
        );
        result.map(|()| chipset)
    }

    // Mode changes

    /// Drive the control lines straight back to compatibility mode
    ///
    /// Used whenever the peripheral stops following the protocol.
    pub fn compatibility(&mut self) {
        self.link = self.link.transition(LinkEvent::ForceCompatibility);
        self.write_dcr(dcr::HOST_BUSY | dcr::HOST_CLK | dcr::N_INIT);
    }

    /// Run the negotiation handshake for `mode`
    ///
    /// Does not check whether the peripheral accepted the mode.
    fn negotiate(&mut self, mode: NegotiationMode) -> Result<()> {
        let handshake = self.timeouts.handshake_ms;
        self.link = self.link.transition(LinkEvent::Negotiate(mode));

        // Hold the extensibility byte for at least 1us
        for _ in 0..4 {
            self.write(reg::DATA, mode.to_byte());
        }
        self.set_clear_dcr(dcr::ACTIVE_1284, dcr::HOST_BUSY);

        let answered = self.wait_dsr_eq(
            dsr::ACK_DATA_REQ | dsr::PTR_CLK | dsr::N_DATA_AVAIL | dsr::XFLAG,
            dsr::ACK_DATA_REQ | dsr::N_DATA_AVAIL | dsr::XFLAG,
            handshake,
        );
        if answered.is_none() {
            return Err(self.negotiation_failed(mode));
        }

        // HostClk pulse, at least 1us low
        self.clear_dcr(dcr::HOST_CLK);
        for _ in 0..3 {
            self.flush_dcr();
        }
        self.set_dcr(dcr::HOST_CLK | dcr::HOST_BUSY);

        if self.wait_dsr_ne(dsr::PTR_CLK, 0, handshake).is_none() {
            return Err(self.negotiation_failed(mode));
        }

        self.link = self.link.transition(LinkEvent::Accepted);
        trace!("negotiated {:?}", mode);
        Ok(())
    }

    fn negotiation_failed(&mut self, mode: NegotiationMode) -> Error {
        warn!("1284 negotiation for {:?} timed out", mode);
        self.link = self.link.transition(LinkEvent::Refused);
        self.compatibility();
        Error::NegotiationFailed
    }

    /// Terminate the negotiated mode
    ///
    /// Always ends in compatibility mode. A peripheral that does not
    /// complete the handshake is forced back and only counted in
    /// [`forced_terminations`](Self::forced_terminations).
    pub fn terminate(&mut self) {
        let handshake = self.timeouts.handshake_ms;

        self.write_ecr(ecr::SPP_IDLE);
        self.set_clear_dcr(dcr::HOST_BUSY | dcr::HOST_CLK, dcr::ACTIVE_1284);

        if self.wait_dsr_eq(dsr::PTR_CLK, 0, handshake).is_some() {
            self.clear_dcr(dcr::HOST_BUSY);
            if self
                .wait_dsr_eq(dsr::PTR_CLK, dsr::PTR_CLK, handshake)
                .is_some()
            {
                self.set_dcr(dcr::HOST_BUSY | dcr::N_INIT);
                self.link = self.link.transition(LinkEvent::Terminated);
                trace!("1284 mode terminated");
                return;
            }
        }

        self.forced_terminations = self.forced_terminations.saturating_add(1);
        debug!("1284 termination timed out, forcing compatibility");
        self.compatibility();
    }

    /// Enter ECP forward mode, if not already there
    pub fn set_ecp_mode(&mut self) -> Result<()> {
        if self.link.is_ecp() {
            return Ok(());
        }
        if self.link.is_nibble() {
            self.terminate();
        }

        self.negotiate(NegotiationMode::Ecp)?;

        if self.read_dsr() & dsr::XFLAG == 0 {
            warn!("peripheral does not support ECP mode");
            self.terminate();
            return Err(Error::NegotiationFailed);
        }

        // Setup phase: HostAck low, wait for PeriphAck low and nAckReverse high
        self.clear_dcr(dcr::HOST_ACK);
        let ready = self.wait_dsr_eq(
            dsr::ACK_DATA_REQ | dsr::PTR_CLK | dsr::BUSY | dsr::XFLAG,
            dsr::ACK_DATA_REQ | dsr::PTR_CLK | dsr::XFLAG,
            self.timeouts.transfer_ms,
        );
        if ready.is_none() {
            warn!("ECP setup phase timed out");
            self.compatibility();
            return Err(Error::NegotiationFailed);
        }

        self.write_ecr(ecr::ECP_IDLE);
        self.set_dcr(dcr::HOST_ACK | dcr::HOST_CLK);
        debug!("ECP forward mode");
        Ok(())
    }

    /// Return to compatibility mode, if a 1284 mode is active
    pub fn set_spp_mode(&mut self) {
        if self.link.is_negotiated() {
            self.terminate();
        }
    }

    /// Check the ECP forward-mode lines, dropping to compatibility on a breach
    fn check_link(&mut self) -> Result<()> {
        if self.read_dsr() & ECP_ALIVE != ECP_ALIVE {
            return Err(self.link_lost());
        }
        Ok(())
    }

    fn link_lost(&mut self) -> Error {
        warn!("ECP protocol breach, peripheral dropped off the link");
        self.link = self.link.transition(LinkEvent::Breach);
        self.compatibility();
        Error::LinkLost
    }

    // Forward transfers

    /// Queue one byte in the ECP FIFO
    ///
    /// A full FIFO is polled every handshake period up to the transfer
    /// timeout, checking the link on each poll. A timeout leaves the port
    /// in ECP mode so the call can be repeated.
    pub fn put_ecp(&mut self, byte: u8) -> Result<()> {
        if self.read_ecr() & ecr::FULL != 0 {
            let poll = self.timeouts.handshake_ms.max(1);
            let polls = (self.timeouts.transfer_ms / poll).max(1);

            let mut drained = false;
            for _ in 0..polls {
                if self.wait_ecr_eq(ecr::FULL, 0, poll) {
                    drained = true;
                    break;
                }
                self.check_link()?;
            }
            if !drained {
                return Err(Error::Timeout);
            }
        }
        self.write(reg::FIFO, byte);
        Ok(())
    }

    /// Send `data` through the ECP FIFO without block transfer
    ///
    /// A timeout forces the port back to compatibility mode.
    pub fn send_polled(&mut self, data: &[u8]) -> Result<()> {
        self.set_ecp_mode()?;
        for &byte in data {
            if let Err(e) = self.put_ecp(byte) {
                if e == Error::Timeout {
                    self.compatibility();
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Strobe one byte out in compatibility mode
    pub fn put_spp(&mut self, byte: u8) -> Result<()> {
        if self.link.is_negotiated() {
            return Err(Error::BadMode);
        }

        if self
            .wait_dsr_eq(dsr::BUSY, 0, self.timeouts.transfer_ms)
            .is_none()
        {
            return Err(Error::PeripheralBusy);
        }

        for _ in 0..4 {
            self.write(reg::DATA, byte);
        }
        self.clear_dcr(dcr::HOST_CLK);

        // Wait for the firmware to latch the byte
        if self
            .wait_dsr_eq(dsr::BUSY, dsr::BUSY, self.timeouts.handshake_ms)
            .is_none()
        {
            self.set_dcr(dcr::HOST_CLK);
            return Err(Error::Timeout);
        }
        self.set_dcr(dcr::HOST_CLK);
        Ok(())
    }

    /// Strobe a block out in compatibility mode
    pub fn send_spp(&mut self, data: &[u8]) -> Result<()> {
        data.iter().try_for_each(|&byte| self.put_spp(byte))
    }

    // Block transfers

    /// Start a block transfer of `data` through `engine`
    ///
    /// Waits for a transfer still in progress to reach terminal count
    /// first. Returns as soon as the new transfer is running.
    pub fn start_block<B>(&mut self, engine: &mut B, data: &[u8]) -> Result<()>
    where
        B: BlockTransfer,
        Error: From<B::Error>,
    {
        self.set_ecp_mode()?;
        if data.is_empty() {
            return Ok(());
        }

        if self.read_ecr() & ecr::DMA_EN != 0 {
            let start = self.clock.now_ms();
            while self.read_ecr() & ecr::SERVICE_INTR == 0 {
                self.check_link()?;
                if self.clock.elapsed_ms(start) >= u64::from(self.timeouts.transfer_ms) {
                    warn!("previous block transfer never completed");
                    self.set_spp_mode();
                    return Err(Error::Timeout);
                }
            }
        }

        engine.abort();
        self.modify_ecr(|v| v & !ecr::DMA_EN);

        self.modify_ecr(|v| v | ecr::N_ERR_INTR_EN | ecr::DMA_EN);
        self.modify_ecr(|v| v & !ecr::SERVICE_INTR);
        if let Err(e) = engine.start(data) {
            self.modify_ecr(|v| v & !ecr::DMA_EN);
            return Err(e.into());
        }

        trace!("block transfer of {} bytes started", data.len());
        Ok(())
    }

    /// Check whether a block transfer is still running
    ///
    /// A transfer that reached terminal count is retired here: the engine
    /// is masked and DMA is disabled in the port.
    pub fn block_busy<B: BlockTransfer>(&mut self, engine: &mut B) -> bool {
        let status = self.read_ecr();
        if status & ecr::DMA_EN == 0 {
            return false;
        }
        if status & ecr::SERVICE_INTR != 0 {
            engine.abort();
            self.modify_ecr(|v| v & !ecr::DMA_EN);
            return false;
        }
        true
    }

    /// Wait for a running block transfer to finish
    pub fn wait_block<B: BlockTransfer>(&mut self, engine: &mut B) -> Result<()> {
        let start = self.clock.now_ms();
        while self.block_busy(engine) {
            if self.clock.elapsed_ms(start) >= u64::from(self.timeouts.transfer_ms) {
                warn!("block transfer timed out");
                self.abort_block(engine);
                self.compatibility();
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Stop any block transfer in progress
    pub fn abort_block<B: BlockTransfer>(&mut self, engine: &mut B) {
        engine.abort();
        self.modify_ecr(|v| v | ecr::SERVICE_INTR);
        self.modify_ecr(|v| v & !ecr::DMA_EN);
    }

    // Reverse transfers

    /// Wait up to `timeout_ms` for the peripheral to request a reverse
    /// transfer while in ECP mode
    pub fn wait_reverse_request(&mut self, timeout_ms: u32) -> Result<()> {
        if !self.link.is_ecp() {
            return Err(Error::BadMode);
        }

        let idle = ECP_ALIVE | dsr::N_DATA_AVAIL;
        let status = self
            .wait_dsr_ne(idle, idle, timeout_ms)
            .ok_or(Error::Timeout)?;

        if status & ECP_ALIVE != ECP_ALIVE {
            return Err(self.link_lost());
        }
        Ok(())
    }

    fn reverse_data_available(&mut self) -> bool {
        self.read_dsr() & dsr::N_DATA_AVAIL == 0
    }

    fn nibble_timeout(&mut self) -> Error {
        debug!("nibble handshake timed out");
        self.compatibility();
        Error::Timeout
    }

    /// One nibble handshake; returns the status lines carrying the nibble
    fn read_nibble(&mut self) -> Result<u8> {
        let handshake = self.timeouts.handshake_ms;

        self.clear_dcr(dcr::HOST_BUSY);
        if self
            .wait_dsr_ne(dsr::PTR_CLK, dsr::PTR_CLK, handshake)
            .is_none()
        {
            return Err(self.nibble_timeout());
        }
        let status = self.read_dsr();

        self.set_dcr(dcr::HOST_BUSY);
        if self.wait_dsr_ne(dsr::PTR_CLK, 0, handshake).is_none() {
            return Err(self.nibble_timeout());
        }
        Ok(status)
    }

    /// Read one byte in reverse nibble mode
    ///
    /// Nibble bits travel on nDataAvail, XFlag, AckDataReq and Busy.
    fn read_nibble_byte(&mut self) -> Result<u8> {
        if !self.link.is_nibble() {
            return Err(Error::BadMode);
        }

        // Peripheral flagged newly available data
        if self.read_dsr() & dsr::ACK_DATA_REQ != 0 {
            self.clear_dcr(dcr::HOST_BUSY);
            if self
                .wait_dsr_ne(
                    dsr::N_DATA_AVAIL,
                    dsr::N_DATA_AVAIL,
                    self.timeouts.transfer_ms,
                )
                .is_none()
            {
                self.set_dcr(dcr::HOST_BUSY);
                self.terminate();
                return Err(Error::NoData);
            }

            self.set_dcr(dcr::HOST_BUSY);
            if self
                .wait_dsr_ne(
                    dsr::ACK_DATA_REQ,
                    dsr::ACK_DATA_REQ,
                    self.timeouts.handshake_ms,
                )
                .is_none()
            {
                return Err(self.nibble_timeout());
            }
        }

        let low = self.read_nibble()?;
        let high = self.read_nibble()?;

        let low = ((low >> 3) & 0x07) | ((low & dsr::BUSY) >> 4);
        let high = ((high << 1) & 0x70) | (high & dsr::BUSY);
        Ok(high | low)
    }

    /// Read reverse data into `buf` using nibble mode
    ///
    /// Terminates ECP mode first if needed. The first byte is waited for;
    /// after that, reading stops as soon as the peripheral has no more
    /// data or `buf` is full. Returns the number of bytes read and leaves
    /// the link in compatibility mode.
    pub fn read_reverse(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.link.is_ecp() {
            self.terminate();
        }
        if !self.link.is_nibble() {
            self.negotiate(NegotiationMode::Nibble)?;
        }

        buf[0] = self.read_nibble_byte()?;
        let mut len = 1;
        while len < buf.len() && self.reverse_data_available() {
            buf[len] = self.read_nibble_byte()?;
            len += 1;
        }

        self.terminate();
        trace!("read {} reverse bytes", len);
        Ok(len)
    }

    /// Read the IEEE-1284 device ID record into `buf`
    ///
    /// The record's two-byte big-endian length prefix is consumed and not
    /// stored. Returns the number of record bytes read; the link is left
    /// in compatibility mode.
    pub fn read_device_id(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.link.is_ecp() {
            self.terminate();
        }
        if buf.len() < 2 {
            return Err(Error::NoData);
        }
        if !self.link.is_nibble() {
            self.negotiate(NegotiationMode::DeviceId)?;
        }

        let count = u16::from_be_bytes([self.read_nibble_byte()?, self.read_nibble_byte()?]);
        if count <= 2 {
            debug!("device ID length {} too short", count);
            self.terminate();
            return Err(Error::NoData);
        }
        let count = usize::from(count - 2).min(buf.len());

        let mut len = 0;
        let mut result = Ok(());
        while len < count && self.reverse_data_available() {
            match self.read_nibble_byte() {
                Ok(byte) => {
                    buf[len] = byte;
                    len += 1;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.set_spp_mode();
        result.map(|()| len)
    }
}
