// Integration tests for depth-watch
//
// - scenarios: detector behaviour through the public session API
// - replay: JSON-lines files through the feed, report and charting rows

mod common;
mod replay;
mod scenarios;
