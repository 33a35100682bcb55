pub mod feed;
pub mod hacker_news;
pub mod retrieval;

pub use feed::FeedProvider;
pub use hacker_news::HackerNewsProvider;
pub use retrieval::RetrievalProvider;
