//! rtc-session-core: call-session lifecycle coordination layer
//!
//! This crate keeps one real-time audio/video session alive and consistent
//! while the hosting application moves through background/foreground
//! transitions, OS interruptions (incoming phone calls), resource pressure
//! (low battery) and device events, and while the hosting process itself
//! may be killed and restarted by the operating system.
//!
//! ## Architecture
//! ```text
//! UI -> SessionController -> SessionHost -> CallSessionStateMachine   (commands)
//! LifecycleSignalSource ---------^                                    (signals)
//! CallSessionStateMachine -> watch channel -> every subscriber        (state)
//! ```
//!
//! The state machine is the sole owner of [`SessionState`]; the host
//! serializes every command, transport result and lifecycle signal into one
//! queue, so transitions are applied one at a time and every observer sees
//! the same totally ordered sequence of snapshots. The actual media
//! transport and signaling negotiation are external collaborators behind
//! the [`SessionTransport`] trait.
//!
//! ## Basic flow
//! ```rust,no_run
//! # use rtc_session_core::*;
//! # use std::sync::Arc;
//! # struct MyTransport;
//! # #[async_trait::async_trait]
//! # impl SessionTransport for MyTransport {
//! #     async fn establish(&self, _params: &SessionParams) -> EstablishOutcome {
//! #         EstablishOutcome::Ack
//! #     }
//! #     async fn teardown(&self) {}
//! # }
//! # async fn example() -> SessionResult<()> {
//! let host = SessionHost::new(SessionConfig::new("session.json"), Arc::new(MyTransport))?;
//!
//! let mut controller = SessionController::new();
//! controller.bind(host.clone());
//!
//! let mut states = controller.state_stream()?;
//! controller.start_call(VideoMode::Webcam, "offer-payload").await?;
//!
//! while let Some(state) = states.next().await {
//!     if state.connection == ConnectionState::Connected {
//!         break;
//!     }
//! }
//!
//! controller.end_call().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod machine;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionStateStream};
pub use error::{SessionError, SessionResult};
pub use events::{AttemptId, Orientation, SessionEvent};
pub use host::{recovery::RetryConfig, HostStats, SessionHost};
pub use lifecycle::LifecycleSignalSource;
pub use machine::{CallSessionStateMachine, Transition, TransportAction};
pub use session::{
    BatteryAdvisory, ConnectionState, ErrorInfo, SessionId, SessionParams, SessionState, VideoMode,
};
pub use transport::{EstablishOutcome, SessionTransport};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
