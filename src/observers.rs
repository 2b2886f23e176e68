use std::{fmt, sync::Arc};

use crate::data::Workspace;
use crate::error::Error;

pub struct Callback<T: ?Sized> {
    cb: Arc<dyn Fn(&T) + 'static + Send + Sync>,
    #[cfg(debug_assertions)]
    dbg: (&'static str, &'static std::panic::Location<'static>),
}
impl<T: ?Sized> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            cb: self.cb.clone(),
            #[cfg(debug_assertions)]
            dbg: self.dbg,
        }
    }
}
impl<T: ?Sized> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_tuple(std::any::type_name::<Self>());

        #[cfg(debug_assertions)]
        {
            let (fn_type_name, fn_location) = self.dbg;
            dbg.field(&format_args!("{fn_type_name} @ {fn_location}"));
        }

        dbg.finish()
    }
}
impl<T: ?Sized> Callback<T> {
    #[inline]
    #[cfg_attr(debug_assertions, track_caller)]
    fn from_fn_base<Base, F>(base: Base, to_callback: impl FnOnce(Base) -> F) -> Self
    where
        F: Fn(&T) + 'static + Send + Sync,
    {
        Self {
            cb: Arc::new(to_callback(base)),
            #[cfg(debug_assertions)]
            dbg: (
                std::any::type_name::<Base>(),
                std::panic::Location::caller(),
            ),
        }
    }

    #[inline]
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn from_fn(callback: impl Fn(&T) + 'static + Send + Sync) -> Self {
        Self::from_fn_base(callback, |cb| cb)
    }

    /// Binds `ctx` as the user data passed on every invocation.
    #[inline]
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn from_fn_ctx<C: 'static + Send + Sync>(
        ctx: C,
        callback: impl Fn(&C, &T) + 'static + Send + Sync,
    ) -> Self {
        Self::from_fn_base(callback, move |cb| move |arg: &T| cb(&ctx, arg))
    }

    pub fn call(&self, arg: &T) {
        (self.cb)(arg)
    }
}
impl<T: ?Sized, F: Fn(&T) + 'static + Send + Sync> From<F> for Callback<T> {
    #[inline]
    #[track_caller]
    fn from(value: F) -> Self {
        Self::from_fn(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkspaceSignal {
    Created,
    Destroyed,
    Blurred,
    Focused,
    Urgent,
    /// Never raised. A rename is reported as `Created` followed by `Destroyed`.
    Renamed,
}
impl WorkspaceSignal {
    const COUNT: usize = 6;

    fn slot(self) -> usize {
        self as usize
    }
}

/// At most one callback per signal. Registering again replaces the previous one.
#[derive(Debug, Default)]
pub struct Observers {
    workspace: [Option<Callback<Workspace>>; WorkspaceSignal::COUNT],
    connection_lost: Option<Callback<()>>,
    error: Option<Callback<Error>>,
}
impl Observers {
    pub fn register(&mut self, signal: WorkspaceSignal, callback: impl Into<Callback<Workspace>>) {
        self.workspace[signal.slot()] = Some(callback.into());
    }
    pub fn register_connection_lost(&mut self, callback: impl Into<Callback<()>>) {
        self.connection_lost = Some(callback.into());
    }
    pub fn register_error(&mut self, callback: impl Into<Callback<Error>>) {
        self.error = Some(callback.into());
    }

    pub fn invoke(&self, signal: WorkspaceSignal, ws: &Workspace) {
        log::debug!("{signal:?} workspace {}", ws.name);
        if let Some(cb) = &self.workspace[signal.slot()] {
            cb.call(ws);
        }
    }
    pub fn invoke_connection_lost(&self) {
        if let Some(cb) = &self.connection_lost {
            cb.call(&());
        }
    }
    pub fn invoke_error(&self, err: &Error) {
        if let Some(cb) = &self.error {
            cb.call(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn ws(name: &str) -> Workspace {
        Workspace {
            name: name.into(),
            num: None,
            focused: false,
            urgent: false,
            output: "eDP-1".into(),
        }
    }

    #[test]
    fn invoke_without_registration_is_noop() {
        let observers = Observers::default();
        observers.invoke(WorkspaceSignal::Created, &ws("1"));
        observers.invoke_connection_lost();
    }

    #[test]
    fn last_registration_wins() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();

        observers.register(
            WorkspaceSignal::Focused,
            Callback::from_fn_ctx((seen.clone(), "first"), |(seen, tag), ws: &Workspace| {
                seen.lock().unwrap().push(format!("{tag}:{}", ws.name));
            }),
        );
        observers.register(
            WorkspaceSignal::Focused,
            Callback::from_fn_ctx((seen.clone(), "second"), |(seen, tag), ws: &Workspace| {
                seen.lock().unwrap().push(format!("{tag}:{}", ws.name));
            }),
        );

        observers.invoke(WorkspaceSignal::Focused, &ws("3"));
        observers.invoke(WorkspaceSignal::Blurred, &ws("2"));
        assert_eq!(*seen.lock().unwrap(), ["second:3"]);
    }
}
