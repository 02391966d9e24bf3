//! Integration tests for the drafting workflow and the postcraft CLI


mod cli_logging;
mod fatal_authorization;
mod orchestrator_flow;
mod share_actions;
