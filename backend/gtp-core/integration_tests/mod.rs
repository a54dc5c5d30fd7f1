mod client;
mod controller;
mod helpers;
