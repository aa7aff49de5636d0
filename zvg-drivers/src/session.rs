//! ZVG device session
//!
//! A [`DeviceSession`] owns everything one connected board needs: the
//! parallel link, the two frame buffers, the encoder mirroring the beam
//! state, and the identification and calibration data read at open.
//!
//! ```text
//! open() ──► Opening ──► Open ──► close() ──► Closing ──► Closed
//!              │
//!              └── detect / self-test failure ──► Closed (error returned)
//! ```
//!
//! Frame cycle: draw with [`vector`](DeviceSession::vector) and friends,
//! then [`send_frame`](DeviceSession::send_frame). Errors while sending
//! are returned without closing the session; retrying is the caller's call.

use log::{debug, info, warn};
use zvg_core::config::{ConfigError, DmaConfig, DmaFallback, PortConfig, SessionConfig, Timeouts};
use zvg_core::state::{SessionEvent, SessionState};
use zvg_core::{Color, Encoder, Error, Point, Result, Window};
use zvg_hal::{BlockTransfer, Clock, PortIo};
use zvg_protocol::device::SPEED_TABLE_SIZE;
use zvg_protocol::{
    CalibrationParam, DeviceId, ExtendedCommand, MonitorInfo, SpeedTable, FLUSH_NOPS,
};

use crate::parport::{EcpTransport, ParallelLink};
use crate::ring::{DmaBufferRing, Transmit};

/// No-ops sent through the link right after detection
pub const SELF_TEST_NOPS: usize = 1024;

/// Largest device ID record read
pub const DEVICE_ID_SIZE: usize = 256;

/// Reverse-channel buffer for query replies
const REPLY_SIZE: usize = 64;

const NOP: u8 = 0xE0;

/// Connection to one ZVG board
pub struct DeviceSession<P, C, B> {
    link: ParallelLink<P, C, B>,
    ring: DmaBufferRing,
    encoder: Encoder,
    config: SessionConfig,
    state: SessionState,
    device_id: Option<DeviceId>,
    monitor: Option<MonitorInfo>,
    speeds: Option<SpeedTable>,
    /// Length of the current buffer when its frame tail was appended by a
    /// send that failed
    unsent_frame: Option<usize>,
}

impl<P, C, B> DeviceSession<P, C, B>
where
    P: PortIo,
    C: Clock,
    B: BlockTransfer,
    Error: From<B::Error>,
{
    /// Detect the port, resolve `port_config` against it and open a session
    ///
    /// `make_engine` is called with the resolved block-transfer settings;
    /// returning `None` sends polled.
    pub fn open<F>(io: P, clock: C, port_config: &PortConfig, make_engine: F) -> Result<Self>
    where
        F: FnOnce(DmaConfig) -> Option<B>,
    {
        let base = port_config.port.ok_or(ConfigError::MissingPort)?;
        let mut transport = EcpTransport::new(io, clock, base, Timeouts::default());
        let chipset = transport.detect()?;
        let config = port_config.resolve(chipset)?;
        Self::start(transport, config, make_engine)
    }

    /// Open a session with an already resolved configuration
    pub fn open_with_config<F>(
        io: P,
        clock: C,
        config: SessionConfig,
        make_engine: F,
    ) -> Result<Self>
    where
        F: FnOnce(DmaConfig) -> Option<B>,
    {
        let mut transport = EcpTransport::new(io, clock, config.port, config.timeouts);
        transport.detect()?;
        Self::start(transport, config, make_engine)
    }

    fn start<F>(
        mut transport: EcpTransport<P, C>,
        config: SessionConfig,
        make_engine: F,
    ) -> Result<Self>
    where
        F: FnOnce(DmaConfig) -> Option<B>,
    {
        let state = SessionState::Closed.transition(SessionEvent::OpenRequested);

        match config.dma_fallback {
            Some(DmaFallback::Disabled) => debug!("block transfer disabled"),
            Some(fallback) => {
                warn!("block transfer unavailable ({:?}), using polled ECP", fallback)
            }
            None => {}
        }
        transport.set_timeouts(config.timeouts);

        let engine = config.dma.and_then(make_engine);
        if config.dma.is_some() && engine.is_none() {
            warn!("no block-transfer engine for DMA channel, using polled ECP");
        }

        let mut session = Self {
            link: ParallelLink::new(transport, engine),
            ring: DmaBufferRing::new(config.buffer_limit),
            encoder: Encoder::new(config.monitor),
            config,
            state,
            device_id: None,
            monitor: None,
            speeds: None,
            unsent_frame: None,
        };

        if let Err(e) = session.self_test() {
            warn!("link self-test failed: {:?}", e);
            session.state = session.state.transition(SessionEvent::OpenFailed);
            return Err(Error::SelfTestFailed(e.kind()));
        }
        session.read_metadata();

        session.encoder.reset();
        session.ring.clear();
        session.encoder.start_frame(session.ring.current_mut())?;

        session.state = session.state.transition(SessionEvent::OpenComplete);
        info!(
            "ZVG session open on {:#x} ({})",
            session.config.port,
            if session.link.uses_block_transfer() {
                "block transfer"
            } else {
                "polled"
            }
        );
        Ok(session)
    }

    /// Flood the link with no-ops past the board's buffer depth
    fn self_test(&mut self) -> Result<()> {
        self.ring.put_slice(&[NOP; SELF_TEST_NOPS])?;
        self.ring.swap_and_send(&mut self.link)?;
        self.link.flush()
    }

    fn read_metadata(&mut self) {
        match self.read_device_id() {
            Ok(id) => info!(
                "ZVG {} firmware {:04x}, VTG {:04x}",
                id.mdl.as_str(),
                id.firmware_version,
                id.vtg_version
            ),
            Err(e) => warn!("device ID read failed: {:?}", e),
        }
        if let Err(e) = self.read_speed_table() {
            warn!("speed table read failed: {:?}", e);
        }
        if let Err(e) = self.read_monitor_info() {
            warn!("monitor calibration read failed: {:?}", e);
        }
    }

    // Accessors

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn link(&mut self) -> &mut ParallelLink<P, C, B> {
        &mut self.link
    }

    pub fn ring(&self) -> &DmaBufferRing {
        &self.ring
    }

    /// Device ID read at open or by the last [`read_device_id`](Self::read_device_id)
    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device_id.as_ref()
    }

    pub fn monitor_info(&self) -> Option<&MonitorInfo> {
        self.monitor.as_ref()
    }

    pub fn speed_table(&self) -> Option<&SpeedTable> {
        self.speeds.as_ref()
    }

    // Drawing

    /// Draw a vector in the current color
    pub fn vector(&mut self, start: Point, end: Point) -> Result<()> {
        self.encoder.vector(self.ring.current_mut(), start, end)?;
        Ok(())
    }

    /// Draw a dot in the current color
    pub fn dot(&mut self, at: Point) -> Result<()> {
        self.vector(at, at)
    }

    pub fn encode_vector(&mut self, start: Point, end: Point, color: Color) -> Result<()> {
        self.encoder
            .encode_vector(self.ring.current_mut(), start, end, color)?;
        Ok(())
    }

    pub fn encode_dot(&mut self, at: Point, color: Color) -> Result<()> {
        self.encoder.encode_dot(self.ring.current_mut(), at, color)?;
        Ok(())
    }

    pub fn set_color(&mut self, color: Color) {
        self.encoder.set_color(color);
    }

    pub fn set_rgb24(&mut self, red: u8, green: u8, blue: u8) {
        self.encoder.set_rgb24(red, green, blue);
    }

    pub fn set_rgb16(&mut self, red: u8, green: u8, blue: u8) {
        self.encoder.set_rgb16(red, green, blue);
    }

    pub fn set_rgb15(&mut self, red: u8, green: u8, blue: u8) {
        self.encoder.set_rgb15(red, green, blue);
    }

    pub fn set_clip_window(&mut self, window: Window) {
        self.encoder.set_clip_window(window);
    }

    pub fn set_clip_overscan(&mut self) {
        self.encoder.set_clip_overscan();
    }

    pub fn set_clip_no_overscan(&mut self) {
        self.encoder.set_clip_no_overscan();
    }

    /// Center the beam mid-frame
    pub fn center(&mut self) -> Result<()> {
        self.encoder.center(self.ring.current_mut())?;
        Ok(())
    }

    /// Finish the frame, send it and start the next one
    ///
    /// If the send fails the frame stays current; calling this again
    /// retries it without appending a second frame tail, unless more was
    /// drawn in between.
    pub fn send_frame(&mut self) -> Result<()> {
        if self.unsent_frame != Some(self.ring.current().len()) {
            self.encoder.end_frame(self.ring.current_mut())?;
        }
        if let Err(e) = self.ring.swap_and_send(&mut self.link) {
            self.unsent_frame = Some(self.ring.current().len());
            return Err(e);
        }
        self.unsent_frame = None;
        self.encoder.start_frame(self.ring.current_mut())?;
        Ok(())
    }

    /// Send the last frame again without re-encoding it
    pub fn resend_previous(&mut self) -> Result<()> {
        self.ring.send_previous(&mut self.link)
    }

    /// Returns true while the last frame is still being transferred
    pub fn transfer_active(&mut self) -> bool {
        self.link.transfer_active()
    }

    pub fn wait_transfer_complete(&mut self) -> Result<()> {
        self.link.wait_transfer_complete()
    }

    // Calibration

    fn command(&mut self, cmd: ExtendedCommand) -> Result<()> {
        self.ring.current_mut().push(cmd.to_byte())?;
        Ok(())
    }

    /// Queue a calibration parameter change in the current frame
    pub fn set_calibration(&mut self, param: CalibrationParam, value: u8) -> Result<()> {
        self.ring
            .current_mut()
            .push_command(&[param.command().to_byte(), value])?;
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.set(param, value);
        }
        Ok(())
    }

    /// Queue only the parameters of `target` that differ from the cached
    /// calibration, or all of them if none is cached
    ///
    /// Returns the number of parameters queued.
    pub fn sync_calibration(&mut self, target: &MonitorInfo) -> Result<usize> {
        let mut queued = 0;
        for param in CalibrationParam::ALL {
            let value = target.get(param);
            if self.monitor.map_or(true, |m| m.get(param) != value) {
                self.set_calibration(param, value)?;
                queued += 1;
            }
        }
        if self.monitor.is_none() {
            self.monitor = Some(*target);
        }
        Ok(queued)
    }

    /// Store the current calibration in the board's EEPROM
    pub fn save_calibration(&mut self) -> Result<()> {
        self.command(ExtendedCommand::SaveEeprom)
    }

    /// Restore calibration from EEPROM
    ///
    /// Drops the cached calibration; read it again to refresh.
    pub fn load_calibration(&mut self) -> Result<()> {
        self.command(ExtendedCommand::LoadEeprom)?;
        self.monitor = None;
        Ok(())
    }

    /// Reset calibration to factory defaults
    pub fn reset_calibration(&mut self) -> Result<()> {
        self.command(ExtendedCommand::ResetMonitor)?;
        self.monitor = None;
        Ok(())
    }

    pub fn blink(&mut self) -> Result<()> {
        self.command(ExtendedCommand::Blink)
    }

    // Queries

    /// Read and cache the device ID record
    pub fn read_device_id(&mut self) -> Result<DeviceId> {
        self.link.flush()?;
        let mut buf = [0u8; DEVICE_ID_SIZE];
        let read = self.link.transport.read_device_id(&mut buf);
        let reentry = self.link.transport.set_ecp_mode();
        let len = read?;
        reentry?;

        let id = DeviceId::parse(&buf[..len])?;
        self.device_id = Some(id.clone());
        Ok(id)
    }

    /// Read and cache the monitor calibration block
    pub fn read_monitor_info(&mut self) -> Result<MonitorInfo> {
        let mut buf = [0u8; REPLY_SIZE];
        let read = self.query(ExtendedCommand::ReadMonitor, &mut buf);
        let reentry = self.link.transport.set_ecp_mode();
        let len = read?;
        reentry?;

        let info = MonitorInfo::from_bytes(&buf[..len])?;
        self.monitor = Some(info);
        Ok(info)
    }

    /// Read and cache the speed table
    pub fn read_speed_table(&mut self) -> Result<SpeedTable> {
        let mut buf = [0u8; SPEED_TABLE_SIZE];
        let read = self.query(ExtendedCommand::ReadSpeed, &mut buf);
        let reentry = self.link.transport.set_ecp_mode();
        let len = read?;
        reentry?;

        let table = SpeedTable::from_bytes(&buf[..len])?;
        self.speeds = Some(table);
        Ok(table)
    }

    /// Send a read-back command and collect the reply
    ///
    /// The command is followed by enough no-ops for the board to execute
    /// it; the reply arrives over the nibble channel.
    fn query(&mut self, cmd: ExtendedCommand, buf: &mut [u8]) -> Result<usize> {
        self.link.flush()?;
        let transport = &mut self.link.transport;
        transport.set_ecp_mode()?;
        transport.put_ecp(cmd.to_byte())?;
        for _ in 0..FLUSH_NOPS {
            transport.put_ecp(NOP)?;
        }
        let timeout = transport.timeouts().transfer_ms;
        transport.wait_reverse_request(timeout)?;
        transport.read_reverse(buf)
    }

    /// Park the beam and release the hardware
    ///
    /// Waits for a transfer in flight, stops the engine, then centers the
    /// beam if the link is still up and leaves ECP mode.
    pub fn close(mut self) -> (P, C, Option<B>) {
        self.state = self.state.transition(SessionEvent::CloseRequested);

        if let Err(e) = self.link.flush() {
            warn!("transfer still running at close: {:?}", e);
        }
        self.link.abort();

        let transport = &mut self.link.transport;
        if transport.link_state().is_ecp() {
            let mut park = [NOP; 2 * FLUSH_NOPS + 2];
            park[FLUSH_NOPS] = ExtendedCommand::Center.to_byte();
            if let Err(e) = park.iter().try_for_each(|&byte| transport.put_ecp(byte)) {
                warn!("could not center beam at close: {:?}", e);
            }
            transport.terminate();
        }

        self.state = self.state.transition(SessionEvent::CloseComplete);
        info!("ZVG session on {:#x} closed", self.config.port);

        let (transport, engine) = self.link.into_parts();
        let (io, clock) = transport.into_parts();
        (io, clock, engine)
    }
}
