//! Loading a config file through a fallible supplier. A failed load caches
//! nothing, so the caller simply retries; a good load sticks until the cache
//! is cleared, and a broken file then surfaces again on the next reload.

use std::collections::HashMap;
use std::sync::Mutex;

use poly_lazy::SyncLazy;

type Config = HashMap<String, String>;

/// Stands in for the file on disk.
static SOURCE: Mutex<&str> = Mutex::new("port = 8080\nworkers = ");

fn parse(text: &str) -> Result<Config, String> {
   text
      .lines()
      .filter(|line| !line.trim().is_empty())
      .map(|line| {
         let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("missing '=' in {line:?}"))?;
         let value = value.trim();
         if value.is_empty() {
            return Err(format!("no value for {:?}", key.trim()));
         }
         Ok((key.trim().to_owned(), value.to_owned()))
      })
      .collect()
}

fn main() {
   let config = SyncLazy::new(|| parse(&SOURCE.lock().unwrap()));

   let mut attempt = 1;
   let loaded = loop {
      match config.try_get() {
         Ok(loaded) => break loaded,
         Err(reason) => {
            println!("load #{attempt} rejected: {reason}");
            assert!(!config.is_cached());
            *SOURCE.lock().unwrap() = "port = 8080\nworkers = 4";
            attempt += 1;
         }
      }
   };
   println!("loaded after {attempt} attempts: {loaded:?}");
   assert_eq!(loaded["workers"], "4");

   // The file breaks again, but the good config keeps being served.
   *SOURCE.lock().unwrap() = "port 9090";
   assert_eq!(config.try_get(), Ok(loaded.clone()));

   // An explicit reload reads the broken file and keeps nothing.
   config.clear_cache();
   let err = config.try_get().unwrap_err();
   println!("reload rejected: {err}");
   assert!(!config.is_cached());
}
