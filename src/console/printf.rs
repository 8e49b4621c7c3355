use crate::sync::spinmutex::SpinMutex;

pub static PRINT_LOCK: SpinMutex<()> = SpinMutex::new(());

/// Print out formatted text to the console.
/// Spins to acquire the lock.
macro_rules! print {
    ($($arg:tt)*) => {{
        use core::fmt::Write;

        let _guard = $crate::console::printf::PRINT_LOCK.lock();
        let _ = core::write!($crate::console::Console, $($arg)*);
    }};
}
pub(crate) use print;

macro_rules! println {
    () => {{
        use $crate::console::printf::print;
        print!("\n");
    }};
    ($($arg:tt)*) => {{
        use $crate::console::printf::print;
        print!("{}\n", format_args!($($arg)*));
    }};
}
pub(crate) use println;

/// Print out formatted text to the console.
/// Does not use any locks.
macro_rules! uprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;

        let _ = core::write!($crate::console::Console, $($arg)*);
    }};
}
pub(crate) use uprint;

macro_rules! uprintln {
    () => {{
        use $crate::console::printf::uprint;
        uprint!("\n");
    }};
    ($($arg:tt)*) => {{
        use $crate::console::printf::uprint;
        uprint!("{}\n", format_args!($($arg)*));
    }};
}
pub(crate) use uprintln;

#[cfg(test)]
mod tests {
    use super::PRINT_LOCK;

    #[test]
    fn print_releases_the_lock() {
        crate::println!("entry point: {:#x}", 0x1000);
        crate::print!("no newline");
        crate::uprintln!();
        let _guard = PRINT_LOCK.try_lock().expect("lock left held");
    }
}
