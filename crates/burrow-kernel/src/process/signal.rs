//! Signal taxonomy.
//!
//! The numbering follows the BSD list (31 entries, HUP through USR2) because
//! that is what `kill -l` prints.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Signal {
    Hup = 1,
    Int,
    Quit,
    Ill,
    Trap,
    Abrt,
    Emt,
    Fpe,
    Kill,
    Bus,
    Segv,
    Sys,
    Pipe,
    Alrm,
    Term,
    Urg,
    Stop,
    Tstp,
    Cont,
    Chld,
    Ttin,
    Ttou,
    Io,
    Xcpu,
    Xfsz,
    Vtalrm,
    Prof,
    Winch,
    Info,
    Usr1,
    Usr2,
}

/// What a process does when a signal arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Terminate,
    Suspend,
    Resume,
    Ignore,
}

impl Signal {
    pub const ALL: [Signal; 31] = [
        Signal::Hup,
        Signal::Int,
        Signal::Quit,
        Signal::Ill,
        Signal::Trap,
        Signal::Abrt,
        Signal::Emt,
        Signal::Fpe,
        Signal::Kill,
        Signal::Bus,
        Signal::Segv,
        Signal::Sys,
        Signal::Pipe,
        Signal::Alrm,
        Signal::Term,
        Signal::Urg,
        Signal::Stop,
        Signal::Tstp,
        Signal::Cont,
        Signal::Chld,
        Signal::Ttin,
        Signal::Ttou,
        Signal::Io,
        Signal::Xcpu,
        Signal::Xfsz,
        Signal::Vtalrm,
        Signal::Prof,
        Signal::Winch,
        Signal::Info,
        Signal::Usr1,
        Signal::Usr2,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Signal> {
        n.checked_sub(1)
            .and_then(|i| Signal::ALL.get(usize::from(i)))
            .copied()
    }

    /// Name without the `SIG` prefix, e.g. `HUP`.
    pub fn short_name(self) -> &'static str {
        match self {
            Signal::Hup => "HUP",
            Signal::Int => "INT",
            Signal::Quit => "QUIT",
            Signal::Ill => "ILL",
            Signal::Trap => "TRAP",
            Signal::Abrt => "ABRT",
            Signal::Emt => "EMT",
            Signal::Fpe => "FPE",
            Signal::Kill => "KILL",
            Signal::Bus => "BUS",
            Signal::Segv => "SEGV",
            Signal::Sys => "SYS",
            Signal::Pipe => "PIPE",
            Signal::Alrm => "ALRM",
            Signal::Term => "TERM",
            Signal::Urg => "URG",
            Signal::Stop => "STOP",
            Signal::Tstp => "TSTP",
            Signal::Cont => "CONT",
            Signal::Chld => "CHLD",
            Signal::Ttin => "TTIN",
            Signal::Ttou => "TTOU",
            Signal::Io => "IO",
            Signal::Xcpu => "XCPU",
            Signal::Xfsz => "XFSZ",
            Signal::Vtalrm => "VTALRM",
            Signal::Prof => "PROF",
            Signal::Winch => "WINCH",
            Signal::Info => "INFO",
            Signal::Usr1 => "USR1",
            Signal::Usr2 => "USR2",
        }
    }

    pub fn disposition(self) -> Disposition {
        match self {
            Signal::Stop | Signal::Tstp | Signal::Ttin | Signal::Ttou => Disposition::Suspend,
            Signal::Cont => Disposition::Resume,
            Signal::Chld | Signal::Urg | Signal::Winch | Signal::Info | Signal::Io => {
                Disposition::Ignore
            }
            _ => Disposition::Terminate,
        }
    }

    /// Exit status of a process terminated by this signal.
    pub fn exit_code(self) -> i32 {
        128 + i32::from(self.number())
    }

    /// The fixed text printed by `kill -l`: seven lines of up to five
    /// tab-separated entries.
    pub fn listing() -> Vec<String> {
        Signal::ALL
            .chunks(5)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, sig)| {
                        if i == 0 {
                            format!("{}) {sig}", sig.number())
                        } else {
                            format!("{:>2}) {sig}", sig.number())
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG{}", self.short_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}: invalid signal specification")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    /// Accepts `9`, `KILL`, `SIGKILL` (any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Signal::from_number(n).ok_or_else(|| UnknownSignal(s.to_string()));
        }
        let upper = s.to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        Signal::ALL
            .iter()
            .copied()
            .find(|sig| sig.short_name() == name)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}
