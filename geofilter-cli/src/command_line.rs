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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(author = "The GeoFilter Rust Authors", version = "0.1.0", about = "GeoFilter CLI(Rust)")]
pub struct RootCli {
    #[arg(short, long, value_name = "FILE", global = true, help = "configuration file (toml, yaml or json)")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", global = true, help = "log level, overrides RUST_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the features come from.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    #[arg(
        short,
        long,
        value_name = "SERVICE",
        help = "service descriptor, inline JSON or a path to a JSON file"
    )]
    pub service: String,

    #[arg(
        short = 'F',
        long,
        value_name = "FILE",
        help = "GeoJSON file loaded as the layer of an intern service"
    )]
    pub features: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(arg_required_else_help = true, about = "list the attributes of a layer and their types")]
    AttrTypes {
        #[command(flatten)]
        source: ServiceArgs,
    },

    #[command(arg_required_else_help = true, about = "smallest and largest value of an attribute")]
    MinMax {
        #[command(flatten)]
        source: ServiceArgs,

        #[arg(short, long, value_name = "ATTR")]
        attr: String,

        #[arg(long, conflicts_with = "max_only")]
        min_only: bool,

        #[arg(long)]
        max_only: bool,

        #[arg(long, value_name = "FORMAT", help = "moment style date format, e.g. DD.MM.YYYY")]
        date_format: Option<String>,

        #[arg(short, long, value_name = "RULES", help = "context rules, inline JSON or a path")]
        rules: Option<String>,
    },

    #[command(arg_required_else_help = true, about = "distinct values of an attribute")]
    UniqueValues {
        #[command(flatten)]
        source: ServiceArgs,

        #[arg(short, long, value_name = "ATTR")]
        attr: String,

        #[arg(short, long, value_name = "RULES", help = "context rules, inline JSON or a path")]
        rules: Option<String>,
    },

    #[command(arg_required_else_help = true, about = "run a filter question and print the matches")]
    Filter {
        #[command(flatten)]
        source: ServiceArgs,

        #[arg(short, long, value_name = "RULES", help = "rules, inline JSON or a path")]
        rules: Option<String>,

        #[arg(short, long, value_name = "SIZE", help = "features examined per page")]
        paging: Option<usize>,

        #[arg(long, value_name = "ID", default_value = "geofilter-cli")]
        filter_id: String,
    },
}
