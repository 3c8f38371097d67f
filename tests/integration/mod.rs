mod helpers;
mod test_cache_key;
mod test_plan;
mod test_run;
mod test_version;
