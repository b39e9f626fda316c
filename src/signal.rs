use std::{fmt, io};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::{download::CancellationToken, warning};

/// Exit code of a process stopped by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "Ctrl+C"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

pub struct Handler {
    #[cfg(unix)]
    sigterm: Signal,
}

impl Handler {
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            ShutdownSignal::Interrupt
        }
    }
}

/// Turns shutdown signals into a cancel request on `token`.
///
/// The first signal lets the running batch stop after the current track; a
/// second one exits the process right away.
pub fn install(token: CancellationToken) -> io::Result<()> {
    let mut handler = Handler::new()?;

    tokio::spawn(async move {
        let signal = handler.recv().await;
        warning!(
            "Received {}, stopping after the current track. Repeat to exit immediately.",
            signal
        );
        log::info!("received {}, cancel requested", signal);
        token.request_kill();

        let signal = handler.recv().await;
        log::warn!("received {} again, exiting", signal);
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });

    Ok(())
}
