// setter.rs — 系统壁纸设置模块
// 设置桌面壁纸是可插拔的能力：支持的平台走 wallpaper 库，其余平台直接报错

use crate::error::{GatherError, Result};
use std::path::Path;
use tracing::debug;

/// 把图片设置为桌面背景的能力
pub trait DesktopBackground {
    fn set_desktop_background(&self, path: &Path) -> Result<()>;
}

/// 调用 wallpaper 库，它会自动识别操作系统/桌面环境并调用相应的 API
pub struct SystemBackground;

impl DesktopBackground for SystemBackground {
    fn set_desktop_background(&self, path: &Path) -> Result<()> {
        // wallpaper 库要求绝对路径
        let absolute = std::path::absolute(path).map_err(|e| GatherError::Platform(e.to_string()))?;
        let path_str = absolute
            .to_str()
            .ok_or_else(|| GatherError::Platform(format!("{} is not valid UTF-8", absolute.display())))?;

        debug!("setting desktop picture to {}", path_str);
        wallpaper::set_from_path(path_str).map_err(|e| GatherError::Platform(e.to_string()))
    }
}

/// 不支持设置壁纸的平台
pub struct UnsupportedBackground;

impl DesktopBackground for UnsupportedBackground {
    fn set_desktop_background(&self, _path: &Path) -> Result<()> {
        Err(GatherError::Platform(format!(
            "setting the desktop background is not supported on {}",
            std::env::consts::OS
        )))
    }
}

/// 按当前平台选择实现
pub fn platform_background() -> Box<dyn DesktopBackground> {
    if cfg!(any(target_os = "macos", target_os = "windows", target_os = "linux")) {
        Box::new(SystemBackground)
    } else {
        Box::new(UnsupportedBackground)
    }
}
