//! TCP front end
//!
//! Exposes the emulated widget as a virtual serial port. Like a physical
//! serial link it serves one host at a time; the processor and its universe
//! persist across connections, but a partial message is dropped when the
//! host disconnects.

use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::event::Event;
use crate::logging::FrameLog;
use crate::processor::Processor;
use crate::serial::MemorySerial;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const READ_BUFFER_SIZE: usize = 1024;

/// Widget emulator listening on a TCP socket
#[derive(Debug)]
pub struct WidgetServer {
    listener: TcpListener,
    processor: Processor<MemorySerial>,
    log: Arc<FrameLog>,
}

impl WidgetServer {
    /// Bind to `config.server` and build the processor from `config`
    ///
    /// # Errors
    /// Returns [`WidgetError::Io`] when the address cannot be bound
    pub async fn bind(config: &WidgetConfig) -> Result<Self, WidgetError> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        let log = Arc::new(FrameLog::new(config.log.capacity));
        let processor =
            Processor::with_config(MemorySerial::new(), config).with_log(Arc::clone(&log));
        Ok(Self {
            listener,
            processor,
            log,
        })
    }

    /// Address actually bound (useful with port 0)
    ///
    /// # Errors
    /// Returns [`WidgetError::Io`] if the socket is gone
    pub fn local_addr(&self) -> Result<SocketAddr, WidgetError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn processor(&self) -> &Processor<MemorySerial> {
        &self.processor
    }

    pub fn log(&self) -> &Arc<FrameLog> {
        &self.log
    }

    /// Serve hosts until the process is stopped
    ///
    /// # Errors
    /// Returns [`WidgetError::Io`] if accepting connections fails
    pub async fn run(self) -> Result<Self, WidgetError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve hosts until `shutdown` completes, then hand the server back
    ///
    /// # Errors
    /// Returns [`WidgetError::Io`] if accepting connections fails. Errors on
    /// an individual connection are logged and the next host is accepted.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<Self, WidgetError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(addr = %self.local_addr()?, "widget listening");

        loop {
            let (stream, peer) = tokio::select! {
                () = shutdown.as_mut() => break,
                accepted = self.listener.accept() => accepted?,
            };
            tracing::info!(%peer, "host connected");

            match self.serve_connection(stream, shutdown.as_mut()).await {
                Ok(true) => break,
                Ok(false) => tracing::info!(%peer, "host disconnected"),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(%peer, error = %e, "connection failed");
                }
                Err(e) => return Err(e),
            }
            self.processor.reset();
            self.processor.port_mut().clear_input();
        }

        tracing::info!(
            accepted = self.processor.stats().frames_accepted,
            rejected = self.processor.stats().frames_rejected(),
            "widget shutting down"
        );
        Ok(self)
    }

    /// Returns `true` when shutdown was requested mid-connection
    async fn serve_connection<F>(
        &mut self,
        mut stream: TcpStream,
        mut shutdown: Pin<&mut F>,
    ) -> Result<bool, WidgetError>
    where
        F: Future<Output = ()>,
    {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let read = tokio::select! {
                () = shutdown.as_mut() => return Ok(true),
                read = stream.read(&mut buf) => read?,
            };
            if read == 0 {
                return Ok(false);
            }

            self.processor.port_mut().feed(&buf[..read]);
            for event in self.processor.process_available() {
                self.report(event);
            }

            let output = self.processor.port_mut().take_output();
            if !output.is_empty() {
                stream.write_all(&output).await?;
            }
        }
    }

    fn report(&self, event: Event) {
        match event {
            Event::DmxData => tracing::debug!(
                active = self.processor.universe().active_channels().count(),
                "dmx data"
            ),
            Event::ParametersChanged => {
                let params = self.processor.parameters();
                tracing::info!(
                    break_time = params.break_time,
                    mab = params.mark_after_break_time,
                    rate = params.dmx_output_rate,
                    "parameters changed"
                );
            }
            Event::ParametersRequested | Event::SerialRequested => {
                tracing::info!(%event, "reply sent");
            }
            Event::None => {}
        }
    }
}
