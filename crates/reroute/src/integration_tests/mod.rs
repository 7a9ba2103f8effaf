//! Integration tests using the `TestSession` harness.
//!
//! These run a headless Bevy App with `RerouteMonitorPlugin` and check the
//! optimizer, feed and controller working together across frames.

mod simulation_tests;
