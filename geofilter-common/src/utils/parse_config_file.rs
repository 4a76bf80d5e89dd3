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

use std::fmt::Debug;
use std::path::Path;

use config::Config;
use config::Environment;
use geofilter_error::GeoFilterResult;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::common::geofilter_config::GeoFilterConfig;

/// Environment prefix for overrides, e.g. `GEOFILTER_PAGING_SIZE=500`.
pub const ENV_PREFIX: &str = "GEOFILTER";

pub fn parse_config_file<C>(config_file: &Path) -> GeoFilterResult<C>
where
    C: Debug + DeserializeOwned,
{
    let cfg = Config::builder()
        .add_source(config::File::from(config_file))
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;
    let config_file = cfg.try_deserialize::<C>()?;
    Ok(config_file)
}

/// Loads the filter configuration, falling back to defaults (plus environment overrides) when no
/// file is given.
pub fn load_geofilter_config(config_file: Option<&Path>) -> GeoFilterResult<GeoFilterConfig> {
    let config = match config_file {
        Some(path) => parse_config_file::<GeoFilterConfig>(path)?,
        None => Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<GeoFilterConfig>()?,
    };
    info!("geofilter config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "paging_size = 25\noaf_limit = 10").unwrap();

        let config: GeoFilterConfig = parse_config_file(file.path()).unwrap();
        assert_eq!(config.paging_size, 25);
        assert_eq!(config.oaf_limit, 10);
        assert_eq!(config.wfs_version, "1.1.0");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = parse_config_file::<GeoFilterConfig>(Path::new("/nonexistent/geofilter.toml")).unwrap_err();
        assert_eq!(err.category(), geofilter_error::ErrorCategory::Configuration);
    }
}
