pub mod channels;
pub mod load;
pub mod outreach;
pub mod scrape;
