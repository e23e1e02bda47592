mod codec;
mod config;
mod status;
mod support;
