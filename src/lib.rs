// Library root
// -----------
// Client library for a lnkshrt link-shortening instance. The binary
// (`main.rs`) maps CLI commands onto these modules.
//
// Module responsibilities:
// - `config`: the persisted settings record, instance/token resolution and
//   the TOML settings store.
// - `api`: builds and sends one HTTP request per operation and classifies
//   the response.
// - `service`: the typed operations (signup, login, create/delete link,
//   ping) built on `api` and `config`.
// - `error`: the classified error kinds every operation can fail with.
// - `ui`: prompts, spinner and colored terminal output.
// - `qr`: QR-code images for shortened links.
// - `commands`: the CLI flows, run against an injected store and transport.
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod qr;
pub mod service;
pub mod ui;
