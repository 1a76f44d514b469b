pub mod fixtures;

#[cfg(test)]
mod lead_tests;
#[cfg(test)]
mod mongo_tests;
#[cfg(test)]
mod user_tests;
#[cfg(test)]
mod ws_tests;
