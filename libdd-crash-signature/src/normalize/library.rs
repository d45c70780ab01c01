// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Frames contributed by well known libraries and runtimes that say nothing about the bug itself:
//! the exit path of glibc, its allocator and fortify checks, the glib main loop and signal
//! machinery, the JVM crash handler, and the generic parts of the Linux kernel.

use crate::frame::{Frame, FunctionName, GdbFrame, KoopsFrame};

/// A call of `function`, restricted to frames whose source file contains one of `files` or whose
/// library contains one of `libraries`. Without any restriction the name alone matches.
struct Call {
    function: &'static str,
    files: &'static [&'static str],
    libraries: &'static [&'static str],
}

const fn call(function: &'static str) -> Call {
    in_file(function, &[])
}

const fn in_file(function: &'static str, files: &'static [&'static str]) -> Call {
    Call {
        function,
        files,
        libraries: &[],
    }
}

const fn in_file_or_library(
    function: &'static str,
    files: &'static [&'static str],
    libraries: &'static [&'static str],
) -> Call {
    Call {
        function,
        files,
        libraries,
    }
}

impl Call {
    fn matches(&self, frame: &GdbFrame) -> bool {
        if frame.function.as_known() != Some(self.function) {
            return false;
        }
        if self.files.is_empty() && self.libraries.is_empty() {
            return true;
        }
        let contains_any = |value: &Option<String>, needles: &[&str]| {
            value
                .as_deref()
                .is_some_and(|value| needles.iter().any(|needle| value.contains(needle)))
        };
        contains_any(&frame.source_file, self.files)
            || contains_any(&frame.library_name, self.libraries)
    }
}

fn any_matches(calls: &[Call], frame: &GdbFrame) -> bool {
    calls.iter().any(|call| call.matches(frame))
}

/// Calls ending the process. Everything above the last of them is the exit path.
const EXIT_CALLS: &[Call] = &[
    in_file("__run_exit_handlers", &["exit.c"]),
    in_file(
        "raise",
        &["pt-raise.c", "libc.so", "libc-", "libpthread.so"],
    ),
    in_file("__GI_raise", &["raise.c"]),
    in_file("exit", &["exit.c"]),
    in_file("abort", &["abort.c", "libc.so", "libc-"]),
    in_file("__GI_abort", &["abort.c"]),
    in_file("__chk_fail", &["chk_fail.c", "libc.so"]),
    in_file("__stack_chk_fail", &["stack_chk_fail.c", "libc.so"]),
    in_file("kill", &["syscall-template.S"]),
];

/// Assertion, fortify and allocator internals. They are dropped together with every frame above
/// them.
const REPORTING_CALLS: &[Call] = &[
    call("__assert_fail"),
    call("__assert_fail_base"),
    call("__chk_fail"),
    call("__fortify_fail"),
    call("__libc_message"),
    call("__longjmp_chk"),
    call("__malloc_assert"),
    call("__strcat_chk"),
    call("__strcpy_chk"),
    call("__strncpy_chk"),
    call("__vsnprintf_chk"),
    call("___vsnprintf_chk"),
    call("__snprintf_chk"),
    call("___snprintf_chk"),
    call("__vasprintf_chk"),
    in_file("malloc_consolidate", &["malloc.c", "libc"]),
    in_file("malloc_printerr", &["malloc.c", "libc"]),
    in_file("_int_malloc", &["malloc.c", "libc"]),
    in_file("_int_free", &["malloc.c", "libc"]),
    in_file("_int_realloc", &["malloc.c", "libc"]),
    in_file("_int_memalign", &["malloc.c"]),
    in_file("__libc_free", &["malloc.c"]),
    in_file("__libc_malloc", &["malloc.c"]),
    in_file("__libc_memalign", &["malloc.c"]),
    in_file("__libc_realloc", &["malloc.c"]),
    in_file("__posix_memalign", &["malloc.c"]),
    in_file("__libc_calloc", &["malloc.c"]),
    // JVM crash handler
    call("JVM_handle_linux_signal"),
    call("VMError::report_and_die"),
    call("os::abort"),
];

/// Frames present in almost every thread, dropped on their own.
const STARTUP_CALLS: &[Call] = &[
    call("_start"),
    in_file("__libc_start_main", &["libc"]),
    in_file("clone", &["clone.S", "libc"]),
    in_file("start_thread", &["pthread_create.c", "libpthread"]),
];

const GLIB_CALLS: &[Call] = &[
    in_file_or_library("g_log", &["gmessages.c"], &["libglib"]),
    in_file_or_library("g_logv", &["gmessages.c"], &["libglib"]),
    in_file_or_library("g_assertion_message", &["gtestutils.c"], &["libglib"]),
    in_file_or_library(
        "g_assertion_message_expr",
        &["gtestutils.c"],
        &["libglib", "libgobject"],
    ),
    in_file("g_closure_invoke", &["gclosure.c"]),
    in_file_or_library("g_free", &["gmem.c"], &["libglib"]),
    in_file_or_library("g_type_class_meta_marshal", &["gclosure.c"], &["libglib"]),
    in_file_or_library("g_signal_emit_valist", &["gsignal.c"], &["libgobject"]),
    in_file_or_library("signal_emit_unlocked_R", &["gsignal.c"], &["libgobject"]),
    in_file_or_library("g_signal_emit", &["gsignal.c"], &["libgobject"]),
    in_file("g_idle_dispatch", &["gmain.c", "gutf8.c"]),
    in_file_or_library(
        "g_object_dispatch_properties_changed",
        &["gobject.c"],
        &["libgobject"],
    ),
    in_file_or_library(
        "g_object_notify_dispatcher",
        &["gobject.c"],
        &["libgobject"],
    ),
    in_file_or_library("g_object_unref", &["gobject.c"], &["libgobject"]),
    in_file_or_library("g_object_run_dispose", &["gobject.c"], &["libgobject"]),
    in_file_or_library("g_object_new", &["gobject.c"], &["libgobject"]),
    in_file_or_library("g_object_newv", &["gobject.c"], &["libgobject"]),
    in_file_or_library("g_main_context_dispatch", &["gmain.c"], &["libglib"]),
    in_file_or_library("g_main_context_iterate", &["gmain.c"], &["libglib"]),
    in_file_or_library("g_main_dispatch", &["gmain.c"], &["libglib"]),
    in_file_or_library("g_main_loop_run", &["gmain.c"], &["libglib"]),
    in_file_or_library("g_timeout_dispatch", &["gmain.c"], &["libglib"]),
    in_file_or_library(
        "g_thread_pool_thread_proxy",
        &["gthreadpool.c"],
        &["libglib"],
    ),
    in_file_or_library("g_thread_create_proxy", &["gthread.c"], &["libglib"]),
    in_file_or_library(
        "g_cclosure_marshal_VOID__BOXED",
        &["gmarshal.c"],
        &["libgobject"],
    ),
    in_file_or_library(
        "g_cclosure_marshal_VOID__VOID",
        &["gclosure.c", "gmarshal.c"],
        &["libgobject"],
    ),
];

/// String and memory functions glibc dispatches to a variant tuned for the CPU.
const ARCH_SPECIFIC_FUNCTIONS: &[&str] = &[
    "memchr",
    "memcmp",
    "memcpy",
    "memmove",
    "memset",
    "rawmemchr",
    "strcasecmp",
    "strcasecmp_l",
    "strcat",
    "strchr",
    "strchrnul",
    "strcmp",
    "strcpy",
    "strcspn",
    "strlen",
    "strncmp",
    "strncpy",
    "strpbrk",
    "strrchr",
    "strspn",
    "strstr",
    "strtok",
];

const ARCH_SUFFIXES: &[&str] = &[
    "_sse2",
    "_sse2_bsf",
    "_ssse3",
    "_ssse3_rep",
    "_sse42",
    "_ia32",
];

/// Generic kernel functions found on most call traces. Only dropped from the core kernel, never
/// from a module.
const KERNEL_BLACKLIST: &[&str] = &[
    "do_softirq",
    "do_vfs_ioctl",
    "flush_kthread_worker",
    "gs_change",
    "irq_exit",
    "kernel_thread_helper",
    "kthread",
    "process_one_work",
    "system_call_fastpath",
    "warn_slowpath_common",
    "warn_slowpath_fmt",
    "warn_slowpath_fmt_taint",
    "warn_slowpath_null",
    "worker_thread",
];

/// `__memcpy_sse2` in a glibc source file becomes `memcpy`.
fn generic_name(frame: &GdbFrame) -> Option<&'static str> {
    let stem = frame.function.as_known()?.strip_prefix("__")?;
    let generic = ARCH_SUFFIXES
        .iter()
        .filter_map(|suffix| stem.strip_suffix(suffix))
        .find_map(|base| ARCH_SPECIFIC_FUNCTIONS.iter().copied().find(|f| *f == base))?;
    let file = frame.source_file.as_deref()?;
    [generic, "/sysdeps", "libc.so"]
        .iter()
        .any(|needle| file.contains(needle))
        .then_some(generic)
}

/// Replaces internal aliases (`IA__g_free`, `__GI_memset`) and CPU specific variants by the
/// public name of the function.
fn strip_aliases(frame: &mut GdbFrame) {
    let Some(name) = frame.function.as_known() else {
        return;
    };
    let stripped = if name.starts_with("IA__g_") || name.starts_with("IA__gtk") {
        name.strip_prefix("IA__")
    } else {
        name.strip_prefix("__GI_")
    };
    if let Some(stripped) = stripped {
        frame.function = FunctionName::from(stripped);
    }
    if let Some(generic) = generic_name(frame) {
        frame.function = FunctionName::from(generic);
    }
}

fn as_gdb(frame: &Frame) -> Option<&GdbFrame> {
    match frame {
        Frame::Gdb(frame) => Some(frame),
        _ => None,
    }
}

/// Drops the frames before and including the last frame matching `calls`.
fn cut_above_last(frames: &mut Vec<Frame>, calls: &[Call]) {
    let last = frames
        .iter()
        .rposition(|frame| as_gdb(frame).is_some_and(|frame| any_matches(calls, frame)));
    if let Some(index) = last {
        frames.drain(..=index);
    }
}

/// Applies the library rules to the frames of a debugger thread.
///
/// The exit path is cut first, on the names as the debugger printed them. Aliases and CPU
/// specific variants are then renamed to their public name, the reporting machinery is cut with
/// everything above it, and startup and glib dispatch frames are dropped.
pub(crate) fn normalize_gdb_frames(frames: &mut Vec<Frame>) {
    cut_above_last(frames, EXIT_CALLS);
    for frame in frames.iter_mut() {
        if let Frame::Gdb(frame) = frame {
            strip_aliases(frame);
        }
    }
    cut_above_last(frames, REPORTING_CALLS);
    frames.retain(|frame| {
        !as_gdb(frame).is_some_and(|frame| {
            any_matches(STARTUP_CALLS, frame) || any_matches(GLIB_CALLS, frame)
        })
    });
}

fn is_blacklisted(frame: &KoopsFrame) -> bool {
    let in_core_kernel = frame.module_name.as_deref().is_none_or(|m| m == "vmlinux");
    in_core_kernel
        && frame
            .function
            .as_known()
            .is_some_and(|name| KERNEL_BLACKLIST.contains(&name))
}

/// Drops generic core kernel frames from a kernel oops thread.
pub(crate) fn normalize_koops_frames(frames: &mut Vec<Frame>) {
    frames.retain(|frame| !matches!(frame, Frame::Koops(frame) if is_blacklisted(frame)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Normalizable;

    fn frame(name: &str, file: &str) -> GdbFrame {
        GdbFrame {
            source_file: Some(file.to_string()),
            ..GdbFrame::with_function(name)
        }
    }

    fn names(frames: Vec<GdbFrame>) -> Vec<String> {
        let mut frames: Vec<Frame> = frames.into_iter().map(Frame::from).collect();
        normalize_gdb_frames(&mut frames);
        frames
            .iter()
            .map(|f| f.function().to_string())
            .collect()
    }

    #[test]
    fn test_call_matching() {
        let raise = in_file("raise", &["pt-raise.c", "libc.so"]);
        assert!(raise.matches(&frame("raise", "../nptl/sysdeps/pt-raise.c")));
        assert!(!raise.matches(&frame("raise", "raise.c")));
        assert!(!raise.matches(&GdbFrame::with_function("raise")));
        assert!(call("_start").matches(&GdbFrame::with_function("_start")));

        let g_free = in_file_or_library("g_free", &["gmem.c"], &["libglib"]);
        let mut from_library = GdbFrame::with_function("g_free");
        from_library.library_name = Some("/lib64/libglib-2.0.so.0".to_string());
        assert!(g_free.matches(&from_library));
    }

    #[test]
    fn test_exit_path_is_cut() {
        let thread = vec![
            frame("raise", "../nptl/sysdeps/unix/sysv/linux/pt-raise.c"),
            frame("abort", "abort.c"),
            frame("crash_here", "main.c"),
            frame("main", "main.c"),
        ];
        assert_eq!(names(thread), ["crash_here", "main"]);
    }

    #[test]
    fn test_arch_specific_names() {
        let thread = vec![
            frame("__memcpy_sse2", "../sysdeps/x86_64/memcpy.S"),
            frame("__strlen_sse42", "strlen.S"),
            frame("__strcasecmp_l_ssse3", "/usr/lib64/libc.so.6"),
            frame("__memcpy_sse2", "mine.c"),
            frame("__GI_memset", "memset.S"),
        ];
        assert_eq!(
            names(thread),
            ["memcpy", "strlen", "strcasecmp_l", "__memcpy_sse2", "memset"]
        );
    }

    #[test]
    fn test_reporting_frames_cut_with_callers_above() {
        let thread = vec![
            frame("raise", "raise.c"),
            frame("__GI___assert_fail", "assert.c"),
            frame("check", "check.c"),
            frame("main", "main.c"),
            frame("__libc_start_main", "libc-start.c"),
            frame("_start", ""),
        ];
        assert_eq!(names(thread), ["check", "main"]);
    }

    #[test]
    fn test_glib_dispatch_dropped() {
        let mut from_library = GdbFrame::with_function("g_main_context_dispatch");
        from_library.library_name = Some("/lib64/libglib-2.0.so.0".to_string());
        let thread = vec![
            frame("on_click", "window.c"),
            frame("IA__g_closure_invoke", "gclosure.c"),
            frame("g_signal_emit", "gsignal.c"),
            from_library,
            frame("IA__gtk_main", "gtkmain.c"),
            frame("main", "main.c"),
        ];
        assert_eq!(names(thread), ["on_click", "gtk_main", "main"]);
    }

    #[test]
    fn test_other_kinds_untouched() {
        let mut frames = vec![Frame::from(KoopsFrame::with_function("_start"))];
        normalize_gdb_frames(&mut frames);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_kernel_blacklist() {
        let mut in_module = KoopsFrame::with_function("worker_thread");
        in_module.module_name = Some("ext4".to_string());
        let mut vmlinux = KoopsFrame::with_function("kthread");
        vmlinux.module_name = Some("vmlinux".to_string());
        let mut frames: Vec<Frame> = vec![
            KoopsFrame::with_function("ext4_write").into(),
            KoopsFrame::with_function("warn_slowpath_null").into(),
            in_module.into(),
            vmlinux.into(),
            KoopsFrame::with_function("worker_thread").into(),
        ];
        normalize_koops_frames(&mut frames);
        let names: Vec<_> = frames
            .iter()
            .map(|f| f.function().to_string())
            .collect();
        assert_eq!(names, ["ext4_write", "worker_thread"]);
    }
}
