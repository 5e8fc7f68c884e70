use std::fmt;

use crate::config::types::{LocationConfig, ServerConfig};

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  \x1b[38;5;244m───────────────────────────────────────────────\x1b[0m"
        )?;
        let listen_fmt = self
            .listen
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mListen:\x1b[0m      \x1b[32m{}\x1b[0m",
            listen_fmt
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mIdentity:\x1b[0m    \x1b[36m{}\x1b[0m",
            self.server_name.as_deref().unwrap_or("(default)")
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mRoot:\x1b[0m        \x1b[32m{}\x1b[0m",
            self.root.as_deref().unwrap_or("(inherited per-location)")
        )?;
        writeln!(
            f,
            "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mBody Limit:\x1b[0m  \x1b[33m{}\x1b[0m",
            self.client_max_body_size
                .map(|n| format!("{} KiB", n / 1024))
                .unwrap_or_else(|| "(http default)".to_string())
        )?;

        if !self.error_pages.is_empty() {
            writeln!(f, "  \x1b[1;34m⦿\x1b[0m \x1b[1;37mError Pages:\x1b[0m")?;
            for (code, path) in &self.error_pages {
                writeln!(
                    f,
                    "    \x1b[38;5;244m{:4}\x1b[0m → \x1b[31m{}\x1b[0m",
                    code, path
                )?;
            }
        }

        writeln!(
            f,
            "\n  \x1b[1;37m📋 ROUTING TABLE ({}) \x1b[0m",
            self.locations.len()
        )?;
        writeln!(
            f,
            "  \x1b[38;5;244m───────────────────────────────────────────────\x1b[0m"
        )?;

        for (idx, location) in self.locations.iter().enumerate() {
            let is_last = idx == self.locations.len() - 1;
            let branch = if is_last { "  └──" } else { "  ├──" };
            writeln!(
                f,
                "  \x1b[38;5;244m{}\x1b[0m \x1b[1;37m{}\x1b[0m",
                branch, location.path
            )?;
            location.fmt_details(f, self, is_last)?;
            if !is_last {
                writeln!(f, "  \x1b[38;5;244m    │\x1b[0m")?;
            }
        }
        Ok(())
    }
}

impl LocationConfig {
    pub(crate) fn fmt_details(
        &self,
        f: &mut fmt::Formatter<'_>,
        server: &ServerConfig,
        is_last_route: bool,
    ) -> fmt::Result {
        let indent = if is_last_route { "     " } else { "  │  " };
        let methods_fmt = self.methods.join(" | ");

        writeln!(
            f,
            "  \x1b[38;5;250m{}├─ Methods:\x1b[0m \x1b[48;5;236m\x1b[38;5;250m {}\x1b[0m",
            if is_last_route { "   " } else { "    " },
            methods_fmt
        )?;
        writeln!(
            f,
            "  \x1b[38;5;250m{}├─ Root:\x1b[0m    \x1b[32m{}\x1b[0m",
            indent,
            self.effective_root(server)
        )?;
        writeln!(
            f,
            "  \x1b[38;5;250m{}├─ Index:\x1b[0m   \x1b[36m{}\x1b[0m",
            indent,
            self.effective_index(server).join(", ")
        )?;
        writeln!(
            f,
            "  \x1b[38;5;250m{}├─ Autoindex:\x1b[0m \x1b[{}m{}\x1b[0m",
            indent,
            if self.autoindex { "32" } else { "31" },
            if self.autoindex { "ON" } else { "OFF" }
        )?;

        if self.upload_enable {
            writeln!(
                f,
                "  \x1b[38;5;250m{}├─ Upload:\x1b[0m  \x1b[32mON\x1b[0m → {}",
                indent,
                self.upload_store.as_deref().unwrap_or("(root)")
            )?;
        }

        if let Some((code, target)) = &self.redirect {
            writeln!(
                f,
                "  \x1b[38;5;250m{}├─ Redirect:\x1b[0m \x1b[35m{} {}\x1b[0m",
                indent, code, target
            )?;
        }
        if !self.cgi.is_empty() {
            let cgi_fmt = self
                .cgi
                .iter()
                .map(|(ext, interp)| format!("{ext}→{interp}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "  \x1b[38;5;250m{}└─ CGI:\x1b[0m     \x1b[38;5;208m{}\x1b[0m",
                indent, cgi_fmt
            )?;
        } else {
            writeln!(
                f,
                "  \x1b[38;5;250m{}└─ CGI:\x1b[0m      \x1b[31mDISABLED\x1b[0m",
                indent
            )?;
        }
        Ok(())
    }
}

pub fn display_config(config: &crate::config::types::AppConfig) {
    println!("\n\x1b[1;35m 🌐 SERVER CONFIGURATION DASHBOARD\x1b[0m");
    println!(
        "\x1b[38;5;240m ════════════════════════════════════════════════════════════════\x1b[0m"
    );
    for (i, server) in config.servers.iter().enumerate() {
        println!("\n  \x1b[1;37mSERVER BLOCK {:02}\x1b[0m", i + 1);
        print!("{}", server);
    }
    println!(
        "\n\x1b[38;5;240m ════════════════════════════════════════════════════════════════\x1b[0m"
    );
    println!(" \x1b[1;32m✔\x1b[0m Configuration loaded successfully - Ready for requests!\n");
}
