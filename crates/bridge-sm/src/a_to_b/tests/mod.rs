//! Tests for the A→B state machine.
