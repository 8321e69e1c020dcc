// SPDX-License-Identifier: MIT
//
// kedit-term: Terminal plumbing for kedit.
//
// Everything the editor needs from a character terminal and nothing more:
// raw mode through termios, a byte source with a short read timeout, a
// decoder that folds escape sequences into logical keys, and the handful
// of escape sequences the frame compositor emits. No editor state lives
// here.
//
// Like the rest of the workspace this crate talks to the terminal
// directly via ANSI escape sequences and raw termios. No TUI framework
// sits between the editor and the bytes it sends.

pub mod ansi;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;
