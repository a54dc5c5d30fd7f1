mod command;
mod engine;
mod spawn;
mod support;
mod util;
