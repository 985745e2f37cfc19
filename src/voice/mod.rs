//! Voice interaction
//!
//! The orb state machine, the speech queue it owns, the async session that
//! drives it, and the speech backends it drives.

pub mod console;
pub mod native;
mod orb;
mod ports;
mod queue;
mod session;
mod settings;
mod wake_word;

pub use orb::{
    Orb, OrbCommand, OrbEvent, OrbState, OrbTimings, Permission, RecognitionId, TurnId,
    WAKE_ACK_TEXT,
};
pub use ports::{
    AlwaysGranted, MicrophonePermission, RecognitionError, RecognitionOptions, SpeechInput,
    SpeechOutput, SynthesisError, Transcript, Utterance,
};
pub use queue::{Dispatch, Finished, SpeechQueue, UtteranceId};
pub use session::{OrbControl, OrbStatus, VoiceHandle, VoicePorts, VoiceSession};
pub use settings::{SUPPORTED_LANGUAGES, VoiceSettings};
pub use wake_word::{WakeMatch, WakeWordMatcher};
