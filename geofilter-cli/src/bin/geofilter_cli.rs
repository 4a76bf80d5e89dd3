// Copyright 2025 The GeoFilter Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use clap::Parser;
use geofilter_cli::command_line::RootCli;
use geofilter_cli::commands::execute;
use geofilter_common::log::init_logger;
use geofilter_common::log::init_logger_with_level;
use geofilter_common::log::Level;
use geofilter_common::ParseConfigFile::load_geofilter_config;
use geofilter_runtime::GeoFilterRuntime;

fn main() -> anyhow::Result<()> {
    let cli = RootCli::parse();
    let config = load_geofilter_config(cli.config.as_deref())?;

    // --log-level wins over RUST_LOG, which wins over the configured level
    let explicit = cli.log_level.as_deref().and_then(Level::parse);
    match explicit {
        Some(level) => init_logger_with_level(level),
        None if std::env::var("RUST_LOG").is_ok() => init_logger(),
        None => init_logger_with_level(Level::parse(&config.log_level).unwrap_or(Level::INFO)),
    }

    let runtime = GeoFilterRuntime::new_multi(2, "geofilter-cli").context("cannot start the tokio runtime")?;
    let output = runtime.block_on(execute(cli.command, &config))?;
    println!("{output}");
    Ok(())
}
