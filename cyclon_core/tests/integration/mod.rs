mod common;
mod motion;
mod pvt_sequence;
mod scheduling;
mod startup;
