//! Built-in commands for burrow.
//!
//! Binaries run in a child process of the caller's group; builtins run in
//! the caller's process so they can change its scope.

mod cat;
mod cd;
mod control;
mod echo;
mod floor;
mod kill;
mod level;
mod ls;
mod mkdir;
mod printf;
mod ps;
mod pwd;
mod read;
mod readonly;
mod rm;
mod seq;
mod sleep;
mod status;
mod wall;
mod wc;

use super::CommandRegistry;

/// Register all built-in commands with the registry.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(echo::Echo);
    registry.register(cat::Cat);
    registry.register(ls::Ls);
    registry.register(mkdir::Mkdir);
    registry.register(rm::Rm);
    registry.register(ps::Ps);
    registry.register(sleep::Sleep);
    registry.register(seq::Seq);
    registry.register(wc::Wc);
    registry.register(floor::Floor);
    registry.register(wall::Wall);

    registry.register(printf::Printf);
    registry.register(kill::Kill);
    registry.register(read::Read);
    registry.register(cd::Cd);
    registry.register(pwd::Pwd);
    registry.register(status::True);
    registry.register(status::False);
    registry.register(readonly::Readonly);
    registry.register(control::Break);
    registry.register(control::Continue);
    registry.register(control::Return);
}
