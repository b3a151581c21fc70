mod helpers;
mod orders;
mod quotes;
mod webhooks;
