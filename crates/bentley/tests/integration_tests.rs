use bentley::*;

#[test]
fn test_basic_logging_functions() {
  info("Loaded collection 'movies'");
  warn("Collection is empty");
  error("Failed to open store");
  success("Ingested 3 movies");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  error(multiline_msg);
}

#[test]
fn test_macros_accept_format_arguments() {
  let count = 3;
  bentley::info!("Ingested {count} movies into {}", "movies");
  bentley::warn!("{} titles skipped", 0);
  bentley::success!("done");
}

#[test]
fn test_verbose_output_can_be_toggled() {
  set_verbose(true);
  bentley::verbose!("probe embedding has {} dimensions", 384);
  bentley::debug!("debug detail");
  set_verbose(false);
  bentley::verbose!("suppressed");
}
