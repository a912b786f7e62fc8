/**
 * Routes Module
 * API route handlers
 */

pub mod health;
pub mod oauth;
pub mod rpc;
pub mod theme;
pub mod upload;
