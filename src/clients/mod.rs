pub mod oauth;
pub mod twitter_client;

pub use oauth::OAuthSigner;
pub use twitter_client::TwitterClient;
