//! LocalFeedLoader use cases, driven through a store spy that completes
//! requests only when a test tells it to.

mod support;
