// Integration tests harness
mod libc_calls {
    include!("libc_calls.rs");
}
mod callbacks {
    include!("callbacks.rs");
}
mod external_memory {
    include!("external_memory.rs");
}
mod instances {
    include!("instances.rs");
}
mod abort_paths {
    include!("abort_paths.rs");
}
