//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

mod config;
mod transport;

use std::sync::Arc;

use clap::{App, Arg};
use config::Config;
use fci_core::dispatch::{Endpoint, EndpointInit};
use fci_driver::stub::StubDriver;
use fci_driver::DriverSurface;
use nix::unistd::{Uid, User};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Layer;
use transport::UnixDatagramTransport;

fn init_tracing(config: &config::Logging) {
    let journald = config
        .journald
        .enabled
        .then(|| tracing_journald::layer().expect("couldn't connect to journald"));

    let file = config.file.enabled.then(|| {
        let file_appender = match config.file.rotation {
            config::LoggingFileRotation::Never => rolling::never(&config.file.dir, &config.file.name),
            config::LoggingFileRotation::Hourly => rolling::hourly(&config.file.dir, &config.file.name),
            config::LoggingFileRotation::Daily => rolling::daily(&config.file.dir, &config.file.name),
        };
        tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(false)
            .with_ansi(false)
            .with_filter(LevelFilter::from_level(tracing::Level::TRACE))
    });

    let stdout = config.stdout.enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(LevelFilter::from_level(tracing::Level::TRACE))
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("fci=info".parse().unwrap())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(journald)
        .with(file)
        .with(stdout)
        .init();
}

/// No privileged driver attachment exists yet, so the only "surface" this
/// binary can stand up is the in-memory stub every other crate tests
/// against. A deployment that attaches to the real accelerator would swap
/// this for a surface built from kernel device handles.
fn driver_surface() -> DriverSurface {
    DriverSurface {
        classifier: Box::new(StubDriver::new()),
        l2_bridge: Box::new(StubDriver::new()),
        routing_table: Box::new(StubDriver::new()),
        tmu: Box::new(StubDriver::new()),
        interfaces: Box::new(StubDriver::new()),
        features: Box::new(StubDriver::new()),
        health_monitor: Box::new(StubDriver::new()),
    }
}

fn main() {
    let matches = App::new("FCI endpoint daemon")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    init_tracing(&config.logging);

    if !Uid::effective().is_root() {
        tracing::warn!("not running as root; binding the control socket may fail");
    }
    if User::from_name(&config.user).ok().flatten().is_none() {
        error!(user = %config.user, "configured user does not exist");
    }

    info!(namespace = %config.namespace, socket = %config.socket_path, "starting up");

    let socket = match UnixDatagramTransport::bind(&config.socket_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, path = %config.socket_path, "failed to bind control socket");
            std::process::exit(1);
        }
    };

    let mask = config::authorized_mask(&config.authorized_senders);
    let endpoint = Endpoint::new(EndpointInit {
        driver: Arc::new(driver_surface()),
        transport: socket.clone(),
        authorized_mask: mask,
        max_clients: config.max_clients,
        namespace: config.namespace.clone(),
        reply_framing: config.reply_framing.into(),
    });
    endpoint.init().expect("endpoint double-initialized");

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    socket.serve(&endpoint);

    endpoint.fini().expect("endpoint was never initialized");
}
