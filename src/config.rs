// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::env;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::{Error, Result, Status};

use accel::Quirks;
use once_cell::sync::{Lazy, OnceCell};
use serde::de;
use serde::{Deserialize, Serialize};
use toml;

#[cfg(not(test))]
const DEFAULT_CONF_DIR: &str = {
    match option_env!("CONFDIR") {
        Some(p) => p,
        None => "/usr/local/etc",
    }
};
#[cfg(test)]
const DEFAULT_CONF_DIR: &str = "test";

pub const DEFAULT_CONF_NAME: &str = "driver.conf";

/// `[gcm]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gcm {
    /// Allow nonces other than 12 bytes through the software GCM path
    pub software_fallback: Option<bool>,
}

/// `[accelerator]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accelerator {
    /// Names of the quirks the accelerator revision exhibits
    pub quirks: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub gcm: Option<Gcm>,
    pub accelerator: Option<Accelerator>,
}

/// Run time options consulted by the engines at setup time
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Options {
    pub software_gcm: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            software_gcm: cfg!(feature = "software-gcm"),
        }
    }
}

static OPTIONS: Lazy<RwLock<Options>> =
    Lazy::new(|| RwLock::new(Options::default()));

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Returns the current driver options
pub fn options() -> Options {
    match OPTIONS.read() {
        Ok(o) => *o,
        Err(_) => Options::default(),
    }
}

pub(crate) fn set_options(opts: Options) -> Result<()> {
    match OPTIONS.write() {
        Ok(mut o) => {
            *o = opts;
            Ok(())
        }
        Err(_) => Err(Status::ServiceFailure)?,
    }
}

fn config_error<E: de::Error + 'static>(error: E) -> Error {
    Error::status_from_error(Status::InvalidArgument, error)
}

impl Config {
    pub fn new() -> Config {
        Config {
            gcm: None,
            accelerator: None,
        }
    }

    pub fn find_conf() -> Result<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        match env::var("HOSTCRYPTO_CONF") {
            Ok(var) => return Ok(var),
            Err(_) => (),
        }
        /* Freedesktop specification for config dirs first
         * then fallback to use $HOME/.config, if that is also not
         * available see if we have a system wide configuration */
        let conffile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/hostcrypto/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => format!(
                    "{}/.config/hostcrypto/{}",
                    home, DEFAULT_CONF_NAME
                ),
                Err(_) => format!(
                    "{}/hostcrypto/{}",
                    DEFAULT_CONF_DIR, DEFAULT_CONF_NAME
                ),
            },
        };
        if Path::new(&conffile).is_file() {
            Ok(conffile)
        } else {
            Err(Status::InvalidArgument)?
        }
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        Config::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Config> {
        let conf: Config = toml::from_str(config_str).map_err(config_error)?;
        /* reject unknown quirks early */
        let _ = conf.quirks()?;
        Ok(conf)
    }

    /// Loads the configuration file if one is found, otherwise returns
    /// the defaults
    pub fn default_config() -> Result<Config> {
        match Config::find_conf() {
            Ok(filename) => Config::from_file(&filename),
            Err(_) => Ok(Config::new()),
        }
    }

    /// The accelerator quirks, all of them when not configured
    pub fn quirks(&self) -> Result<Quirks> {
        let names = match &self.accelerator {
            Some(Accelerator {
                quirks: Some(names),
            }) => names,
            _ => return Ok(Quirks::default()),
        };
        let mut quirks = Quirks::empty();
        for name in names {
            match Quirks::from_name(name) {
                Some(q) => quirks |= q,
                None => {
                    return Err(Error::status_with_errmsg(
                        Status::InvalidArgument,
                        format!("unknown accelerator quirk {}", name),
                    ))
                }
            }
        }
        Ok(quirks)
    }

    pub fn options(&self) -> Options {
        let mut opts = Options::default();
        if let Some(Gcm {
            software_fallback: Some(fallback),
        }) = self.gcm
        {
            /* can only restrict what was compiled in */
            opts.software_gcm = opts.software_gcm && fallback;
        }
        opts
    }

    /// Programs the accelerator and the driver options
    pub fn apply(&self) -> Result<()> {
        accel::set_quirks(self.quirks()?)?;
        set_options(self.options())
    }
}

/// Loads the driver configuration and applies it, only the first call
/// has any effect
pub fn init() -> Result<()> {
    INITIALIZED.get_or_try_init(|| -> Result<()> {
        let conf = Config::default_config()?;
        conf.apply()
    })?;
    Ok(())
}
