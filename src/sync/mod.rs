pub mod spinmutex;
