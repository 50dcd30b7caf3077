//! Bootstrap script construction.
//!
//! The bootstrap runs inside the content environment at every navigation
//! start, before any page script. It builds the frozen `$trestle`
//! namespace with one async function per subscribed channel, the
//! correlation table that pairs outgoing calls with the resolver
//! functions the host invokes, per-call timers, the event-listener
//! surface, and console forwarding.
//!
//! The template is typed at the seam: [`BootstrapScript`] substitutes
//! each token with JSON it serializes itself, so channel names are never
//! spliced into script text by hand.

use trestle_common::BootstrapManifest;

/// Content-side bootstrap, parameterized by the `__TRESTLE_*__` tokens.
pub const BOOTSTRAP_TEMPLATE: &str = r#"
(function () {
    if (window.$trestle) { return; }

    var channels = __TRESTLE_CHANNELS__;
    var options = __TRESTLE_OPTIONS__;
    var platform = __TRESTLE_PLATFORM__;
    var device = __TRESTLE_DEVICE__;
    var version = __TRESTLE_VERSION__;
    var LOG_CHANNELS = ['trestlelog', 'trestledebug', 'trestleerror', 'trestleinfo'];

    var resolvers = {};
    var listeners = { timeout: [], error: [] };

    var native = {
        log: console.log, debug: console.debug,
        error: console.error, info: console.info
    };

    var has = function (obj, key) {
        return Object.prototype.hasOwnProperty.call(obj, key);
    };

    var genId = function () {
        var id;
        do {
            id = 'f' + Math.random().toString(16).slice(2, 10).padEnd(8, '0');
        } while (has(resolvers, id) || typeof window[id] !== 'undefined');
        return id;
    };

    var emit = function (kind, detail) {
        var cbs = listeners[kind];
        for (var i = 0; i < cbs.length; i += 1) {
            try { cbs[i](detail); } catch (e) { native.error.call(console, e); }
        }
    };

    var post = function (name, body) {
        if (typeof window.__trestlePost__ === 'function') {
            window.__trestlePost__(name, body);
        } else if (window.webkit && window.webkit.messageHandlers
                && window.webkit.messageHandlers[name]) {
            window.webkit.messageHandlers[name].postMessage(body);
        } else if (window.ipc && typeof window.ipc.postMessage === 'function') {
            window.ipc.postMessage(JSON.stringify({ name: name, body: body }));
        } else {
            throw new Error('no message channel available');
        }
    };

    var asString = function (value) {
        if (typeof value === 'string') { return value; }
        try { return JSON.stringify(value); } catch (e) { return String(value); }
    };

    var call = function (name, args) {
        return new Promise(function (resolve, reject) {
            var id = genId();
            var entry = { timer: null };
            resolvers[id] = entry;

            var settle = function () {
                if (entry.timer !== null) { clearTimeout(entry.timer); }
                delete resolvers[id];
                try { delete window[id]; } catch (e) { window[id] = undefined; }
            };

            window[id] = function (success, error, result) {
                if (!has(resolvers, id)) { return; }
                settle();
                if (success) {
                    resolve(result === undefined ? null : result);
                } else {
                    var reason = error === null || error === undefined
                        ? 'call failed' : asString(error);
                    emit('error', { function: name, message: reason });
                    reject(new Error(reason));
                }
            };

            if (options.timeout > 0) {
                entry.timer = setTimeout(function () {
                    if (!has(resolvers, id)) { return; }
                    entry.timer = null;
                    settle();
                    emit('timeout', { function: name });
                    reject(new Error('call to ' + name + ' timed out'));
                }, options.timeout);
            }

            var failure = null;
            try {
                post(name, { funName: id, property: args });
            } catch (first) {
                if (LOG_CHANNELS.indexOf(name) !== -1) {
                    try {
                        post(name, { funName: id, property: args.map(asString) });
                    } catch (second) {
                        failure = second;
                    }
                } else {
                    failure = first;
                }
            }
            if (failure !== null && has(resolvers, id)) {
                settle();
                var message = 'delivery to ' + name + ' failed: ' + asString(
                    failure && failure.message ? failure.message : failure);
                emit('error', { function: name, message: message });
                reject(new Error(message));
            }
        });
    };

    var namespace = {
        version: version,
        isDesktop: platform.isDesktop,
        isMobile: platform.isMobile,
        device: device,
        options: Object.freeze(options),
        web: {},
        addEventListener: function (kind, callback) {
            if (!has(listeners, kind) || typeof callback !== 'function') { return; }
            listeners[kind].push(callback);
        }
    };

    channels.forEach(function (name) {
        namespace[name] = function () {
            return call(name, Array.prototype.slice.call(arguments));
        };
    });

    ['log', 'debug', 'error', 'info'].forEach(function (level) {
        var channel = 'trestle' + level;
        console[level] = function () {
            var args = Array.prototype.slice.call(arguments);
            native[level].apply(console, args);
            if (typeof namespace[channel] === 'function') {
                namespace[channel].apply(null, args).catch(function () {});
            }
        };
    });

    window.$trestle = Object.freeze(namespace);

    var readyHook = window.onTrestleReady;
    var fireReady = function (fn) {
        if (typeof fn !== 'function') { return; }
        try { fn(window.$trestle); } catch (e) { native.error.call(console, e); }
    };
    try {
        Object.defineProperty(window, 'onTrestleReady', {
            configurable: true,
            get: function () { return readyHook; },
            set: function (fn) { readyHook = fn; fireReady(fn); }
        });
    } catch (e) { /* property already claimed: fall back to the initial hook */ }
    fireReady(readyHook);
})();
"#;

/// Renders [`BOOTSTRAP_TEMPLATE`] against a manifest.
#[derive(Debug, Clone)]
pub struct BootstrapScript {
    manifest: BootstrapManifest,
}

impl BootstrapScript {
    pub fn new(manifest: BootstrapManifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &BootstrapManifest {
        &self.manifest
    }

    /// Substitute every token with serialized manifest data.
    pub fn render(&self) -> String {
        let channels = serde_json::to_string(&self.manifest.channels)
            .unwrap_or_else(|_| "[]".to_string());
        let options = serde_json::to_string(&self.manifest.options)
            .unwrap_or_else(|_| "{\"timeout\":60000}".to_string());
        let platform = serde_json::to_string(&self.manifest.platform)
            .unwrap_or_else(|_| "{\"isDesktop\":true,\"isMobile\":false}".to_string());
        let device = self.manifest.device.to_string();
        let version = serde_json::to_string(&self.manifest.version)
            .unwrap_or_else(|_| "\"0.0.0\"".to_string());
        BOOTSTRAP_TEMPLATE
            .replace("__TRESTLE_CHANNELS__", &channels)
            .replace("__TRESTLE_OPTIONS__", &options)
            .replace("__TRESTLE_PLATFORM__", &platform)
            .replace("__TRESTLE_DEVICE__", &device)
            .replace("__TRESTLE_VERSION__", &version)
    }
}
