//! Process exit statuses.
//!
//! Codes 65, 69 and 70 borrow their meaning from `sysexits.h`
//! (`EX_DATAERR`, `EX_UNAVAILABLE`, `EX_SOFTWARE`); 130 is the shell's
//! convention for a Ctrl-C stop.
//!
//! | Code | Name | Raised when |
//! |------|------|-------------|
//! | 0 | `SUCCESS` | the command finished |
//! | 1 | `INTERNAL` | anything not listed below |
//! | 2 | `CLI_ARGS` | bad flags or an invalid configuration |
//! | 65 | `INVARIANT` | the session refused an operation |
//! | 69 | `SERVICE_FAILURE` | the question or report service failed |
//! | 70 | `SIMULATOR_FAILURE` | neither simulator produced an answer |
//! | 130 | `INTERRUPTED` | the user stopped the run |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CLI_ARGS: ExitCode = ExitCode(2);
    pub const INVARIANT: ExitCode = ExitCode(65);
    pub const SERVICE_FAILURE: ExitCode = ExitCode(69);
    pub const SIMULATOR_FAILURE: ExitCode = ExitCode(70);
    pub const INTERRUPTED: ExitCode = ExitCode(130);

    /// Value for `std::process::exit`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}
